use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

macro_rules! define_search_stats {
    ( $( $name:ident => $desc:expr ),* $(,)? ) => {
        #[derive(Debug, Default)]
        pub struct SearchStats {
            $(
                #[doc = $desc]
                pub $name: AtomicU64,
            )*
        }

        impl SearchStats {
            #[must_use]
            pub const fn new() -> Self {
                Self {
                    $($name: AtomicU64::new(0),)*
                }
            }

            #[must_use]
            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }
        }

        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
        pub struct StatsSnapshot {
            $(pub $name: u64,)*
        }

        impl StatsSnapshot {
            #[must_use]
            pub const fn delta_since(&self, previous: &Self) -> Self {
                Self {
                    $($name: self.$name.saturating_sub(previous.$name),)*
                }
            }
        }
    };
}

define_search_stats! {
    tasks_run => "tasks run",
    expansions => "nodes expanded",
    children_generated => "children generated",
    duplicates_pruned => "duplicates pruned",
    goal_checks => "goal checks",
    collaborator_failures => "collaborator failures",
    cancelled_tasks => "tasks skipped after stop",
}

impl SearchStats {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
