//! Deterministic RNG-stream partitioning for parallel workers.
//!
//! Reproducibility across worker layouts rests on a single documented
//! rule: each rank seeds independently from a base seed plus a
//! rank-dependent offset. This is the sole source of reproducibility
//! (spec §5/§9); it is normative, not an implementation detail.

use crate::config::RngAlgorithm;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Compute the rank-dependent seed used to initialize a worker's RNG
/// stream.
///
/// This is the normative offset function from the distributed worker
/// (spec §4.4): `base_seed + 29*(rank+1) + 1`. Rank 0 is the manager in
/// distributed mode, but every rank -- including the manager -- uses this
/// same formula, so a sequential run (rank 0 only) and a distributed run
/// share the same rank-0 stream.
pub fn partition_seed(base_seed: u64, rank: usize) -> u64 {
    base_seed
        .wrapping_add(29u64.wrapping_mul(rank as u64 + 1))
        .wrapping_add(1)
}

/// Build a seeded `StdRng` for the given rank.
pub fn rng_for_rank(base_seed: u64, rank: usize) -> StdRng {
    StdRng::seed_from_u64(partition_seed(base_seed, rank))
}

/// Build a boxed RNG stream for `seed` using the recognized
/// `rng.algorithm` configuration option (spec §6): `Standard` is
/// `rand::rngs::StdRng`, `Xoshiro256StarStar` is
/// `rand_xoshiro::Xoshiro256StarStar`.
pub fn build_rng(algorithm: RngAlgorithm, seed: u64) -> Box<dyn RngCore> {
    match algorithm {
        RngAlgorithm::Standard => Box::new(StdRng::seed_from_u64(seed)),
        RngAlgorithm::Xoshiro256StarStar => Box::new(Xoshiro256StarStar::seed_from_u64(seed)),
    }
}

/// Build a boxed, rank-seeded RNG stream under the chosen algorithm --
/// the algorithm-aware counterpart to [`rng_for_rank`].
pub fn rng_for_rank_with(algorithm: RngAlgorithm, base_seed: u64, rank: usize) -> Box<dyn RngCore> {
    build_rng(algorithm, partition_seed(base_seed, rank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_deterministic_and_rank_varying() {
        let a = partition_seed(0, 0);
        let b = partition_seed(0, 1);
        let c = partition_seed(0, 0);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(a, 30);
        assert_eq!(b, 59);
    }

    #[test]
    fn same_rank_and_seed_yields_bit_identical_stream() {
        use rand::Rng;
        let mut r1 = rng_for_rank(42, 3);
        let mut r2 = rng_for_rank(42, 3);
        let v1: Vec<f64> = (0..10).map(|_| r1.gen::<f64>()).collect();
        let v2: Vec<f64> = (0..10).map(|_| r2.gen::<f64>()).collect();
        assert_eq!(v1, v2);
    }

    #[test]
    fn build_rng_is_deterministic_per_algorithm() {
        use rand::Rng;
        for algorithm in [RngAlgorithm::Standard, RngAlgorithm::Xoshiro256StarStar] {
            let mut r1 = build_rng(algorithm, 7);
            let mut r2 = build_rng(algorithm, 7);
            let v1: Vec<f64> = (0..5).map(|_| r1.gen::<f64>()).collect();
            let v2: Vec<f64> = (0..5).map(|_| r2.gen::<f64>()).collect();
            assert_eq!(v1, v2);
        }
    }

    #[test]
    fn the_two_algorithms_produce_different_streams() {
        use rand::Rng;
        let mut standard = build_rng(RngAlgorithm::Standard, 7);
        let mut xoshiro = build_rng(RngAlgorithm::Xoshiro256StarStar, 7);
        let a: Vec<f64> = (0..5).map(|_| standard.gen::<f64>()).collect();
        let b: Vec<f64> = (0..5).map(|_| xoshiro.gen::<f64>()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn rng_for_rank_with_varies_by_rank() {
        use rand::Rng;
        let mut r0 = rng_for_rank_with(RngAlgorithm::Xoshiro256StarStar, 0, 0);
        let mut r1 = rng_for_rank_with(RngAlgorithm::Xoshiro256StarStar, 0, 1);
        let a: f64 = r0.gen();
        let b: f64 = r1.gen();
        assert_ne!(a, b);
    }
}
