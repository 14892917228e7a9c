//! Walk from a hashed bucket to the next free one.
//!
//! Pure: the caller passes the set of octets already in use. Every walk wraps
//! inside `[OCTET_BASE, OCTET_BASE + OCTET_SPAN)`.

use crate::config::{self, OCTET_BASE, OCTET_SPAN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Probe sequence used when the hashed bucket is taken.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStrategy {
    /// start, start+1, start+2, ...
    #[default]
    Linear,
    /// start + i² for i in 0..span, then a linear sweep.
    Quadratic,
}

fn wrap(start: u8, offset: u64) -> u8 {
    let index = (start.saturating_sub(OCTET_BASE) as u64 + offset) % OCTET_SPAN as u64;
    OCTET_BASE + index as u8
}

/// Octets visited from `start`, in order. The first item is `start` itself.
///
/// Quadratic offsets do not cover every residue of 200, so the quadratic
/// sequence ends with a full linear sweep. May repeat octets.
pub fn probe_sequence(start: u8, strategy: ProbeStrategy) -> Box<dyn Iterator<Item = u8>> {
    let span = OCTET_SPAN as u64;
    let linear = (0..span).map(move |i| wrap(start, i));
    match strategy {
        ProbeStrategy::Linear => Box::new(linear),
        ProbeStrategy::Quadratic => {
            let quadratic = (0..span).map(move |i| wrap(start, (i * i) % span));
            Box::new(quadratic.chain(linear))
        }
    }
}

/// First octet in the probe sequence that is not in `in_use`.
///
/// Returns `None` when all buckets are taken.
pub fn next_free(start: u8, in_use: &BTreeSet<u8>, strategy: ProbeStrategy) -> Option<u8> {
    let found = probe_sequence(start, strategy).find(|octet| !in_use.contains(octet));
    if let Some(octet) = found {
        if octet != start {
            log::debug!("probe {strategy:?}: {start} taken, moved to {octet}");
        }
    }
    found
}

/// Probability that `n` keys hashed into the buckets produce at least one collision.
///
/// Birthday bound `1 - prod(1 - i/span)`. Crosses 50% at 17 keys.
pub fn collision_probability(n: usize) -> f64 {
    let span = config::OCTET_SPAN as usize;
    if n > span {
        return 1.0;
    }
    let unique: f64 = (0..n).map(|i| 1.0 - i as f64 / span as f64).product();
    1.0 - unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(octets: &[u8]) -> BTreeSet<u8> {
        octets.iter().copied().collect()
    }

    #[test]
    fn test_free_start_is_returned() {
        assert_eq!(next_free(87, &set(&[]), ProbeStrategy::Linear), Some(87));
        assert_eq!(next_free(87, &set(&[86]), ProbeStrategy::Quadratic), Some(87));
    }

    #[test]
    fn test_linear_probe() {
        assert_eq!(next_free(87, &set(&[87]), ProbeStrategy::Linear), Some(88));
        assert_eq!(next_free(87, &set(&[87, 88]), ProbeStrategy::Linear), Some(89));
    }

    #[test]
    fn test_quadratic_probe() {
        // offsets 0, 1, 4
        assert_eq!(
            next_free(87, &set(&[87, 88]), ProbeStrategy::Quadratic),
            Some(91)
        );
    }

    #[test]
    fn test_probe_wraps_inside_range() {
        assert_eq!(next_free(249, &set(&[249]), ProbeStrategy::Linear), Some(50));
        assert_eq!(
            next_free(249, &set(&[249, 50]), ProbeStrategy::Quadratic),
            Some(53)
        );
    }

    #[test]
    fn test_quadratic_reaches_every_bucket() {
        // only one free bucket, not reachable by i² offsets from 50
        let all_but_one: BTreeSet<u8> = (50..=249).filter(|o| *o != 52).collect();
        assert_eq!(
            next_free(50, &all_but_one, ProbeStrategy::Quadratic),
            Some(52)
        );
    }

    #[test]
    fn test_exhausted() {
        let all: BTreeSet<u8> = (50..=249).collect();
        assert_eq!(next_free(120, &all, ProbeStrategy::Linear), None);
        assert_eq!(next_free(120, &all, ProbeStrategy::Quadratic), None);
    }

    #[test]
    fn test_sequence_stays_in_range() {
        for strategy in [ProbeStrategy::Linear, ProbeStrategy::Quadratic] {
            assert!(probe_sequence(200, strategy).all(|o| (50..=249).contains(&o)));
        }
    }

    #[test]
    fn test_collision_probability() {
        assert_eq!(collision_probability(0), 0.0);
        assert_eq!(collision_probability(1), 0.0);
        assert!((collision_probability(2) - 0.005).abs() < 1e-9);
        assert!(collision_probability(16) < 0.5);
        assert!(collision_probability(17) > 0.5);
        assert_eq!(collision_probability(201), 1.0);
    }
}
