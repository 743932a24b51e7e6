//! The free-streaming ("move") operator: each particle hops one lattice
//! spacing along the direction it's pointed in, into a fresh grid.
//!
//! Implemented as a pull, not a push: for every destination cell we ask
//! "which neighbour, if any, is about to send a particle my way in this
//! direction?" and copy that bit across. This is what lets rows stream
//! independently and in parallel: a destination row only reads its
//! source-side neighbour rows, never writes outside itself.
//!
//! The hex grid packs two offset row parities into one rectangular array, so
//! the neighbour table differs for even and odd `y`.

use crate::error::SimError;
use crate::fanout;
use crate::grid::{Direction, Grid, REST_BIT, WALL_BIT};

/// Applies one streaming step, reading `src` and writing the result into `dst`.
///
/// `src` and `dst` must have identical dimensions. Cells that would pull from
/// off the W x H domain are left empty in that direction (outflow boundary on
/// all four edges).
pub struct Streamer {
    n_threads: usize,
}

impl Streamer {
    pub fn new(n_threads: usize) -> Self {
        Streamer { n_threads }
    }

    pub fn step(&self, src: &Grid, dst: &mut Grid) -> Result<(), SimError> {
        assert_eq!(src.width(), dst.width());
        assert_eq!(src.height(), dst.height());
        let width = src.width();
        let height = src.height();

        fanout::parallel_rows_mut(dst.cells_mut(), width, self.n_threads, |y, row| {
            stream_row(src, row, width, height, y);
        })
    }
}

/// Pulls the six directional bits and the rest bit into `dst_row`, row `y` of
/// the destination grid.
fn stream_row(src: &Grid, dst_row: &mut [u8], width: usize, height: usize, y: usize) {
    for x in 0..width {
        let mut out = 0u8;

        for dir in [Direction::D0, Direction::D1, Direction::D2, Direction::D3, Direction::D4, Direction::D5] {
            if let Some((sx, sy)) = source_of(x, y, width, height, dir) {
                if src.get(sx, sy) & dir.bit() != 0 {
                    out |= dir.bit();
                }
            }
        }

        // The rest particle and the wall flag never move.
        out |= src.get(x, y) & ((1 << REST_BIT) | (1 << WALL_BIT));

        // A wall cell doesn't absorb incoming streamers from neighbours this
        // way either: its own collide step bounces them back next phase, so
        // plain pull-streaming into a wall cell is correct as written.
        dst_row[x] = out;
    }
}

/// For a destination cell `(x, y)`, returns the neighbour cell that would send
/// a particle travelling in `dir`, or `None` if that neighbour is off-grid.
///
/// `d2` (+x) and `d5` (-x) are always horizontal. The other four are
/// diagonal and their source offset depends on the row parity of `y`.
fn source_of(x: usize, y: usize, width: usize, height: usize, dir: Direction) -> Option<(usize, usize)> {
    let odd = y % 2 == 1;
    let (dx, dy): (isize, isize) = match (dir, odd) {
        (Direction::D2, _) => (-1, 0),
        (Direction::D5, _) => (1, 0),
        (Direction::D0, false) => (1, 1),
        (Direction::D0, true) => (0, 1),
        (Direction::D1, false) => (0, 1),
        (Direction::D1, true) => (-1, 1),
        (Direction::D3, false) => (1, -1),
        (Direction::D3, true) => (0, -1),
        (Direction::D4, false) => (0, -1),
        (Direction::D4, true) => (-1, -1),
    };

    let sx = x as isize + dx;
    let sy = y as isize + dy;
    if sx < 0 || sy < 0 || sx as usize >= width || sy as usize >= height {
        None
    } else {
        Some((sx as usize, sy as usize))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_particle_moves_one_step_east() {
        let mut src = Grid::new(5, 3);
        src.set(1, 1, Direction::D2.bit());
        let mut dst = Grid::new(5, 3);
        Streamer::new(1).step(&src, &mut dst).unwrap();
        assert_eq!(dst.get(2, 1), Direction::D2.bit());
        assert_eq!(dst.get(1, 1), 0);
    }

    #[test]
    fn particle_leaving_the_domain_vanishes() {
        let mut src = Grid::new(4, 3);
        src.set(3, 1, Direction::D2.bit());
        let mut dst = Grid::new(4, 3);
        Streamer::new(1).step(&src, &mut dst).unwrap();
        assert_eq!(dst.cells().iter().sum::<u8>(), 0);
    }

    #[test]
    fn rest_and_wall_bits_are_preserved_in_place() {
        let mut src = Grid::new(4, 3);
        src.set(2, 1, (1 << REST_BIT) | (1 << WALL_BIT));
        let mut dst = Grid::new(4, 3);
        Streamer::new(1).step(&src, &mut dst).unwrap();
        assert_eq!(dst.get(2, 1), (1 << REST_BIT) | (1 << WALL_BIT));
    }

    #[test]
    fn streaming_is_parallel_invariant() {
        let mut src = Grid::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                src.set(x, y, ((x + y) % 7) as u8);
            }
        }
        let mut single = Grid::new(6, 6);
        let mut multi = Grid::new(6, 6);
        Streamer::new(1).step(&src, &mut single).unwrap();
        Streamer::new(4).step(&src, &mut multi).unwrap();
        assert_eq!(single.cells(), multi.cells());
    }
}
