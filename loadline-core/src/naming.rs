// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Destination reference derivation.
//!
//! Every iteration pushes to its own tag under `<target>/loadline`. The tag
//! scheme sits behind [`DestinationNamer`] so the sweep never depends on how
//! uniqueness is achieved.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Repository name appended to the registry target.
pub const REPOSITORY: &str = "loadline";

/// Produces the raw destination reference for an iteration.
pub trait DestinationNamer {
    fn destination(&mut self, target: &str, iteration_index: u64) -> String;
}

/// Selectable tag schemes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    #[default]
    Clock,
    RunScoped,
}

impl NamingScheme {
    pub fn namer(self) -> Box<dyn DestinationNamer> {
        match self {
            NamingScheme::Clock => Box::new(ClockNamer),
            NamingScheme::RunScoped => Box::new(RunScopedNamer::new()),
        }
    }
}

/// `<target>/loadline:<subsec-nanos>-<index>`.
///
/// Unique within a run through the index; two runs against the same target
/// can collide if they hit the same nanosecond.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockNamer;

impl DestinationNamer for ClockNamer {
    fn destination(&mut self, target: &str, iteration_index: u64) -> String {
        format!(
            "{}/{}:{}-{}",
            target,
            REPOSITORY,
            Utc::now().timestamp_subsec_nanos(),
            iteration_index
        )
    }
}

/// `<target>/loadline:<run-id>-<index>` with a random per-run id.
#[derive(Debug, Clone)]
pub struct RunScopedNamer {
    run_id: String,
}

impl RunScopedNamer {
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4().simple().to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for RunScopedNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl DestinationNamer for RunScopedNamer {
    fn destination(&mut self, target: &str, iteration_index: u64) -> String {
        format!("{}/{}:{}-{}", target, REPOSITORY, self.run_id, iteration_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_namer_format() {
        let dst = ClockNamer.destination("localhost:5000/bench", 12);
        let tag = dst
            .strip_prefix("localhost:5000/bench/loadline:")
            .expect("repository prefix");
        let (nanos, index) = tag.split_once('-').unwrap();
        assert!(nanos.parse::<u32>().unwrap() < 1_000_000_000);
        assert_eq!(index, "12");
    }

    #[test]
    fn test_run_scoped_namer_is_stable_per_run() {
        let mut namer = RunScopedNamer::with_run_id("abc123");
        assert_eq!(
            namer.destination("reg.example/team", 0),
            "reg.example/team/loadline:abc123-0"
        );
        assert_eq!(
            namer.destination("reg.example/team", 1),
            "reg.example/team/loadline:abc123-1"
        );
    }

    #[test]
    fn test_run_ids_differ() {
        let a = RunScopedNamer::new();
        let b = RunScopedNamer::new();
        assert_ne!(a.run_id(), b.run_id());
        // Tags allow at most 128 characters; a simple uuid is 32.
        assert_eq!(a.run_id().len(), 32);
    }

    #[test]
    fn test_scheme_selects_namer() {
        let mut namer = NamingScheme::RunScoped.namer();
        let dst = namer.destination("reg.example/team", 3);
        assert!(dst.starts_with("reg.example/team/loadline:"));
        assert!(dst.ends_with("-3"));
    }
}
