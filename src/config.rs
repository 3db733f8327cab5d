// src/config.rs

use log::warn;
use std::str::FromStr;

/// Mean Earth radius used by the haversine distance, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Below this many nearby results the fetcher asks the directory for everyone
pub const MIN_CANDIDATES_BEFORE_BROADEN: usize = 3;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 50_000.0;

// One-click auto-assignment picks the single nearest responder
pub const AUTO_ASSIGN_COUNT: usize = 1;

/// Runtime knobs for candidate fetching and submission.
///
/// Passed explicitly into the fetcher and the submitter so the matching
/// logic never reads process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub candidate_limit: usize,
    pub max_distance_meters: f64,
    pub min_candidates: usize,
    pub allow_empty_submission: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            max_distance_meters: DEFAULT_MAX_DISTANCE_METERS,
            min_candidates: MIN_CANDIDATES_BEFORE_BROADEN,
            allow_empty_submission: false,
        }
    }
}

impl DispatchConfig {
    /// Reads `DISPATCH_*` environment variables, keeping the default for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            candidate_limit: parse_or(
                &lookup,
                "DISPATCH_CANDIDATE_LIMIT",
                defaults.candidate_limit,
            ),
            max_distance_meters: parse_or(
                &lookup,
                "DISPATCH_MAX_DISTANCE_METERS",
                defaults.max_distance_meters,
            ),
            min_candidates: parse_or(&lookup, "DISPATCH_MIN_CANDIDATES", defaults.min_candidates),
            allow_empty_submission: parse_or(
                &lookup,
                "DISPATCH_ALLOW_EMPTY_SUBMISSION",
                defaults.allow_empty_submission,
            ),
        }
    }
}

pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Ignoring {}={:?}: not a valid value, using default {:?}",
                    key, raw, default
                );
                default
            }
        },
        None => default,
    }
}
