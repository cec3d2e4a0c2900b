//! Wall-clock scaling of search and sort. Timings depend on the machine
//! and its load, so these are the only transforms whose output is not
//! reproducible run to run.

use std::hint::black_box;
use std::time::Instant;

use crate::data::synth::SeededRng;

/// Measured durations in seconds, one per array size.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    pub sizes: Vec<f64>,
    pub seconds: Vec<f64>,
}

fn time<F: FnOnce() -> R, R>(f: F) -> f64 {
    let start = Instant::now();
    black_box(f());
    start.elapsed().as_secs_f64().max(1e-9)
}

/// Time a scan for one element at 40% of a sorted array, and binary
/// searches for 1000 evenly spread keys, for each size.
pub fn search_scaling(sizes: &[usize]) -> (Timings, Timings) {
    let mut linear = Vec::with_capacity(sizes.len());
    let mut binary = Vec::with_capacity(sizes.len());
    for &n in sizes {
        let x: Vec<u32> = (0..n as u32).collect();
        let item = (0.4 * n as f64) as u32;
        linear.push(time(|| x.iter().position(|&v| v == black_box(item))));

        let keys: Vec<u32> = crate::data::model::linspace(0.0, n as f64, 1000)
            .iter()
            .map(|&k| k as u32)
            .collect();
        binary.push(time(|| {
            keys.iter()
                .map(|k| x.binary_search(k).unwrap_or_else(|i| i))
                .sum::<usize>()
        }));
        log::debug!("search n={n}: linear {:?} binary {:?}", linear.last(), binary.last());
    }
    let sizes: Vec<f64> = sizes.iter().map(|&n| n as f64).collect();
    (
        Timings {
            sizes: sizes.clone(),
            seconds: linear,
        },
        Timings {
            sizes,
            seconds: binary,
        },
    )
}

/// Time an in-place unstable sort of contiguous `f64`s and a stable sort
/// of boxed values (pointer-chasing, like a list of objects) on uniform
/// random data.
pub fn sort_scaling(flat_sizes: &[usize], boxed_sizes: &[usize], seed: u64) -> (Timings, Timings) {
    let mut rng = SeededRng::new(seed);
    let flat = flat_sizes
        .iter()
        .map(|&n| {
            let mut x = rng.uniform(n);
            time(move || {
                x.sort_unstable_by(f64::total_cmp);
                x.len()
            })
        })
        .collect();
    let boxed = boxed_sizes
        .iter()
        .map(|&n| {
            let mut x: Vec<Box<f64>> = rng.uniform(n).into_iter().map(Box::new).collect();
            time(move || {
                x.sort_by(|a, b| a.total_cmp(b));
                x.len()
            })
        })
        .collect();
    (
        Timings {
            sizes: flat_sizes.iter().map(|&n| n as f64).collect(),
            seconds: flat,
        },
        Timings {
            sizes: boxed_sizes.iter().map(|&n| n as f64).collect(),
            seconds: boxed,
        },
    )
}

/// Sizes `10^a .. 10^b` in `n` log-spaced steps.
pub fn log_sizes(a: f64, b: f64, n: usize) -> Vec<usize> {
    crate::data::model::linspace(a, b, n)
        .iter()
        .map(|e| 10f64.powf(*e) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_timing_per_size() {
        let sizes = log_sizes(2.0, 3.0, 4);
        assert_eq!(sizes.len(), 4);
        assert_eq!(&sizes[..3], &[100, 215, 464]);
        let (lin, bin) = search_scaling(&sizes);
        assert_eq!(lin.seconds.len(), 4);
        assert_eq!(bin.sizes[..3], [100.0, 215.0, 464.0]);
        assert!(lin.seconds.iter().chain(&bin.seconds).all(|&s| s > 0.0));

        let (flat, boxed) = sort_scaling(&sizes, &sizes[..2], 0);
        assert_eq!(flat.seconds.len(), 4);
        assert_eq!(boxed.seconds.len(), 2);
    }
}
