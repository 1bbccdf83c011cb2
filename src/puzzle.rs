use std::fmt;

use rand::{Rng, seq::IndexedRandom};

use crate::{
    error::{BoardError, ProblemError},
    problem::Problem,
};

/// Direction the blank cell moves in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slide {
    Up,
    Down,
    Left,
    Right,
}

impl Slide {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Slide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// Row-major tile arrangement. `0` is the blank.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    width: usize,
    height: usize,
    tiles: Box<[u8]>,
    blank: usize,
}

const MAX_CELLS: usize = 255;

const fn check_dimensions(width: usize, height: usize) -> Result<usize, BoardError> {
    let cells = width.saturating_mul(height);
    if width < 2 || height < 2 || cells > MAX_CELLS {
        return Err(BoardError::Dimensions { width, height });
    }
    Ok(cells)
}

impl Board {
    pub fn solved(width: usize, height: usize) -> Result<Self, BoardError> {
        let cells = check_dimensions(width, height)?;
        let mut tiles: Vec<u8> = (1..cells).filter_map(|tile| u8::try_from(tile).ok()).collect();
        tiles.push(0);
        Ok(Self {
            width,
            height,
            tiles: tiles.into_boxed_slice(),
            blank: cells - 1,
        })
    }

    pub fn from_tiles(width: usize, height: usize, tiles: Vec<u8>) -> Result<Self, BoardError> {
        let cells = check_dimensions(width, height)?;
        if tiles.len() != cells {
            return Err(BoardError::Length {
                expected: cells,
                got: tiles.len(),
            });
        }
        let mut seen = vec![false; cells];
        for &tile in &tiles {
            let Some(slot) = seen.get_mut(usize::from(tile)) else {
                return Err(BoardError::NotPermutation { cells });
            };
            if *slot {
                return Err(BoardError::NotPermutation { cells });
            }
            *slot = true;
        }
        let blank = tiles
            .iter()
            .position(|&tile| tile == 0)
            .ok_or(BoardError::NotPermutation { cells })?;
        Ok(Self {
            width,
            height,
            tiles: tiles.into_boxed_slice(),
            blank,
        })
    }

    /// Random walk of `moves` slides from the solved board, never undoing the
    /// previous slide. The result is always solvable.
    pub fn scrambled<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        moves: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let mut board = Self::solved(width, height)?;
        let mut last: Option<Slide> = None;
        for _ in 0..moves {
            let choices: Vec<Slide> = board
                .legal_slides()
                .filter(|slide| last != Some(slide.opposite()))
                .collect();
            let Some(&slide) = choices.choose(rng) else {
                break;
            };
            if let Some(next) = board.slide(slide) {
                board = next;
                last = Some(slide);
            }
        }
        Ok(board)
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    /// `(row, column)` of the blank.
    #[inline]
    pub const fn blank(&self) -> (usize, usize) {
        (self.blank / self.width, self.blank % self.width)
    }

    pub fn is_solved(&self) -> bool {
        let last = self.tiles.len() - 1;
        self.blank == last
            && self.tiles[..last]
                .iter()
                .enumerate()
                .all(|(idx, &tile)| usize::from(tile) == idx + 1)
    }

    fn target(&self, slide: Slide) -> Option<usize> {
        let (row, col) = self.blank();
        match slide {
            Slide::Up => (row > 0).then(|| self.blank - self.width),
            Slide::Down => (row + 1 < self.height).then(|| self.blank + self.width),
            Slide::Left => (col > 0).then(|| self.blank - 1),
            Slide::Right => (col + 1 < self.width).then(|| self.blank + 1),
        }
    }

    pub fn can_slide(&self, slide: Slide) -> bool {
        self.target(slide).is_some()
    }

    pub fn legal_slides(&self) -> impl Iterator<Item = Slide> + '_ {
        Slide::ALL.into_iter().filter(|&slide| self.can_slide(slide))
    }

    /// Board after moving the blank one cell, or `None` at an edge.
    #[must_use]
    pub fn slide(&self, slide: Slide) -> Option<Self> {
        let target = self.target(slide)?;
        let mut tiles = self.tiles.clone();
        tiles.swap(self.blank, target);
        Some(Self {
            width: self.width,
            height: self.height,
            tiles,
            blank: target,
        })
    }

    /// Inversion parity test against the solved arrangement.
    pub fn is_solvable(&self) -> bool {
        let numbered: Vec<u8> = self.tiles.iter().copied().filter(|&tile| tile != 0).collect();
        let inversions: usize = numbered
            .iter()
            .enumerate()
            .map(|(idx, &tile)| numbered[idx + 1..].iter().filter(|&&later| later < tile).count())
            .sum();
        if self.width % 2 == 1 {
            inversions % 2 == 0
        } else {
            let row_from_bottom = self.height - self.blank().0;
            (inversions + row_from_bottom) % 2 == 1
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell_width = (self.tiles.len() - 1).to_string().len();
        for (row_idx, row) in self.tiles.chunks(self.width).enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            for (col, &tile) in row.iter().enumerate() {
                if col > 0 {
                    f.write_str(" ")?;
                }
                if tile == 0 {
                    write!(f, "{:>cell_width$}", ".")?;
                } else {
                    write!(f, "{tile:>cell_width$}")?;
                }
            }
        }
        Ok(())
    }
}

/// Sliding-tile puzzle: reach the solved arrangement from `start`.
pub struct SlidingPuzzle {
    start: Board,
}

impl SlidingPuzzle {
    #[must_use]
    pub const fn new(start: Board) -> Self {
        Self { start }
    }

    #[must_use]
    pub const fn start(&self) -> &Board {
        &self.start
    }
}

impl Problem for SlidingPuzzle {
    type Position = Board;
    type Move = Slide;

    fn initial_position(&self) -> Board {
        self.start.clone()
    }

    fn is_goal(&self, position: &Board) -> bool {
        position.is_solved()
    }

    fn legal_moves(&self, position: &Board) -> Result<Vec<Slide>, ProblemError> {
        Ok(position.legal_slides().collect())
    }

    fn apply_move(&self, position: &Board, mov: &Slide) -> Result<Board, ProblemError> {
        position
            .slide(*mov)
            .ok_or_else(|| ProblemError::msg(format!("blank cannot move {mov}")))
    }
}
