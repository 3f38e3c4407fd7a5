//! Bounded fan-out over the rayon pool.
//!
//! Work items are processed in chunks of at most `max_concurrent`, each chunk
//! in parallel, so memory held by in-flight items stays capped. Results are
//! always returned in input order, which keeps parallel and sequential runs
//! interchangeable.

use rayon::prelude::*;

/// Maps `f` over `items`, sequentially when `max_concurrent` is `None`,
/// otherwise in parallel with at most `max_concurrent` items in flight.
///
/// # Panics
///
/// Panics if `max_concurrent` is `Some(0)`.
pub fn map_bounded<T, R, F>(items: &[T], max_concurrent: Option<usize>, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let Some(limit) = max_concurrent else {
        return items.iter().map(f).collect();
    };
    assert!(limit > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(limit) {
        let chunk_results: Vec<R> = chunk.par_iter().map(&f).collect();
        results.extend(chunk_results);
    }
    results
}

/// Like [`map_bounded`], but the closure returns `Result<R, E>`.
///
/// Returns the error of the earliest failing item in input order. Items after
/// it within the same chunk may already have been processed.
pub fn try_map_bounded<T, R, E, F>(
    items: &[T],
    max_concurrent: Option<usize>,
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    let Some(limit) = max_concurrent else {
        return items.iter().map(f).collect();
    };
    assert!(limit > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(limit) {
        let chunk_results: Vec<Result<R, E>> = chunk.par_iter().map(&f).collect();
        for result in chunk_results {
            results.push(result?);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sequential_and_parallel_agree() {
        let items: Vec<u64> = (0..100).collect();
        let sequential = map_bounded(&items, None, |&x| x * x);
        let parallel = map_bounded(&items, Some(4), |&x| x * x);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[10], 100);
    }

    #[test]
    fn empty_input() {
        let items: Vec<u64> = vec![];
        assert!(map_bounded(&items, Some(3), |&x| x).is_empty());
        assert!(map_bounded(&items, None, |&x| x).is_empty());
    }

    #[test]
    #[should_panic(expected = "max_concurrent must be > 0")]
    fn zero_limit_panics() {
        map_bounded(&[1, 2, 3], Some(0), |&x| x);
    }

    #[test]
    fn limit_caps_items_in_flight() {
        let items: Vec<i32> = (0..20).collect();
        let in_flight = AtomicUsize::new(0);
        let max_observed = AtomicUsize::new(0);

        map_bounded(&items, Some(3), |&x| {
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_observed.fetch_max(current, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            x
        });

        let max = max_observed.load(Ordering::SeqCst);
        assert!(max <= 3, "max in-flight was {max}, expected <= 3");
    }

    #[test]
    fn try_map_reports_first_error_in_order() {
        let items: Vec<i32> = (0..10).collect();
        for limit in [None, Some(4)] {
            let result: Result<Vec<i32>, String> = try_map_bounded(&items, limit, |&x| {
                if x == 5 || x == 7 {
                    Err(format!("bad {x}"))
                } else {
                    Ok(x)
                }
            });
            assert_eq!(result.unwrap_err(), "bad 5");
        }
    }

    #[test]
    fn try_map_ok() {
        let items: Vec<i32> = (0..6).collect();
        let result: Result<Vec<i32>, &str> = try_map_bounded(&items, Some(2), |&x| Ok(x + 1));
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
