//! Results cache behaviour seen from a pipeline's side.

use std::cell::Cell;

use astrofig::cache::{CacheKey, ResultsCache};
use serde::Serialize;

#[derive(Serialize)]
struct Params {
    n: usize,
    seed: u64,
}

fn expensive(calls: &Cell<usize>, n: usize) -> anyhow::Result<Vec<f64>> {
    calls.set(calls.get() + 1);
    Ok((0..n).map(|i| (i as f64).sqrt() / 3.0).collect())
}

#[test]
fn hit_skips_computation_and_returns_equal_value() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultsCache::new(dir.path(), true);
    let calls = Cell::new(0);
    let params = Params { n: 100, seed: 1 };

    let first: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, params.n)).unwrap();
    let second: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, params.n)).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn changed_parameters_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultsCache::new(dir.path(), true);
    let calls = Cell::new(0);
    for n in [10, 11, 10] {
        let params = Params { n, seed: 0 };
        let v: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, n)).unwrap();
        assert_eq!(v.len(), n);
    }
    assert_eq!(calls.get(), 2);
}

#[test]
fn corrupted_entry_is_recomputed_and_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultsCache::new(dir.path(), true);
    let calls = Cell::new(0);
    let params = Params { n: 20, seed: 7 };

    let original: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, params.n)).unwrap();
    let path = cache.path_for(&CacheKey::new("roots", &params).unwrap());
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    let again: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, params.n)).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(again, original);

    // The rewritten entry is a hit again.
    let third: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, params.n)).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(third, original);
}

#[test]
fn disabled_cache_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultsCache::new(dir.path().join("off"), false);
    let calls = Cell::new(0);
    let params = Params { n: 5, seed: 0 };
    for _ in 0..2 {
        let _: Vec<f64> = cache.get_or_compute("roots", &params, || expensive(&calls, 5)).unwrap();
    }
    assert_eq!(calls.get(), 2);
    assert!(!dir.path().join("off").exists());
}
