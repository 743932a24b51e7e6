//! Row-banded parallel dispatch, shared by `Streamer`, `Collider`, and `Reducer`.
//!
//! Splits a row range into `n` equal bands (the last band absorbs the
//! remainder) and runs one scoped-thread worker per band. Workers never see
//! overlapping row ranges, so no synchronisation is needed beyond the join at
//! the end of the phase.

use crate::error::SimError;

/// Runs `body(y)` for every row `y` in `[0, height)`, fanned out across `n_threads`
/// scoped workers. Blocks until all workers join.
///
/// If any worker panics, the panic is caught and surfaced as
/// [`SimError::WorkerPanicked`] once every worker has finished.
pub fn parallel_rows<F>(height: usize, n_threads: usize, body: F) -> Result<(), SimError>
where
    F: Fn(usize) + Sync,
{
    let n_threads = n_threads.max(1).min(height.max(1));
    let band = height / n_threads;

    let result = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(n_threads);
        for thread_no in 0..n_threads {
            let from = band * thread_no;
            let to = if thread_no == n_threads - 1 { height } else { band * (thread_no + 1) };
            let body = &body;
            handles.push(scope.spawn(move || {
                for y in from..to {
                    body(y);
                }
            }));
        }

        let mut panicked = false;
        for handle in handles {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        panicked
    });

    if result {
        return Err(SimError::WorkerPanicked);
    }
    Ok(())
}

/// Like [`parallel_rows`], but hands each worker an exclusive mutable slice of
/// its own rows out of `cells` (a row-major `width`-wide buffer), rather than
/// just a row index. Lets writers avoid any `unsafe` aliasing games.
pub fn parallel_rows_mut<T, F>(cells: &mut [T], width: usize, n_threads: usize, body: F) -> Result<(), SimError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let height = cells.len() / width;
    let n_threads = n_threads.max(1).min(height.max(1));
    let band = height / n_threads;

    let result = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(n_threads);
        let mut rest = cells;
        let mut from_row = 0usize;
        for thread_no in 0..n_threads {
            let rows_in_band = if thread_no == n_threads - 1 {
                rest.len() / width
            } else {
                band
            };
            let (band_cells, tail) = rest.split_at_mut(rows_in_band * width);
            rest = tail;
            let body = &body;
            let base = from_row;
            handles.push(scope.spawn(move || {
                for (i, row) in band_cells.chunks_mut(width).enumerate() {
                    body(base + i, row);
                }
            }));
            from_row += rows_in_band;
        }

        let mut panicked = false;
        for handle in handles {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        panicked
    });

    if result {
        return Err(SimError::WorkerPanicked);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn visits_every_row_exactly_once() {
        let counts: Vec<AtomicUsize> = (0..17).map(|_| AtomicUsize::new(0)).collect();
        parallel_rows(17, 4, |y| {
            counts[y].fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        for c in &counts {
            assert_eq!(c.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn last_band_absorbs_remainder() {
        let touched: Vec<AtomicUsize> = (0..10).map(|_| AtomicUsize::new(0)).collect();
        parallel_rows(10, 3, |y| {
            touched[y].fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(touched.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn rows_mut_gives_each_worker_disjoint_rows() {
        let width = 3;
        let mut cells = vec![0u8; width * 7];
        parallel_rows_mut(&mut cells, width, 3, |y, row| {
            row.fill(y as u8);
        })
        .unwrap();
        for y in 0..7 {
            assert!(cells[y * width..(y + 1) * width].iter().all(|&v| v == y as u8));
        }
    }

    #[test]
    fn worker_panic_surfaces_as_error() {
        let result = parallel_rows(4, 2, |y| {
            if y == 3 {
                panic!("boom");
            }
        });
        assert_eq!(result, Err(SimError::WorkerPanicked));
    }
}
