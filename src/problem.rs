use std::hash::Hash;

use crate::error::ProblemError;

/// A search problem explored by the solver.
///
/// Every method may be called concurrently from several worker threads, so
/// implementations must be pure with respect to the positions they receive.
/// `apply_move` must be deterministic.
pub trait Problem: Send + Sync + 'static {
    type Position: Clone + Eq + Hash + Send + Sync + 'static;
    type Move: Clone + Send + Sync + 'static;

    fn initial_position(&self) -> Self::Position;

    fn is_goal(&self, position: &Self::Position) -> bool;

    fn legal_moves(&self, position: &Self::Position) -> Result<Vec<Self::Move>, ProblemError>;

    fn apply_move(
        &self,
        position: &Self::Position,
        mov: &Self::Move,
    ) -> Result<Self::Position, ProblemError>;
}

/// Replays `moves` from the initial position and reports whether the final
/// position is a goal.
pub fn replay_reaches_goal<P: Problem>(problem: &P, moves: &[P::Move]) -> Result<bool, ProblemError> {
    let mut position = problem.initial_position();
    for mov in moves {
        position = problem.apply_move(&position, mov)?;
    }
    Ok(problem.is_goal(&position))
}
