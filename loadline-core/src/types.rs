// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated sweep inputs, and the sweep's value types.
//!
//! All wrappers validate their invariants at creation time, so a
//! `SweepParameters` that exists always describes a finite, non-empty sweep.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Smallest image size in the sweep: 1 KiB.
pub const SIZE_BASE: u64 = 1024;
/// Size ceiling (inclusive): 1 GiB.
pub const MAX_SIZE: u64 = SIZE_BASE * SIZE_BASE * SIZE_BASE;
/// Layer count ceiling (inclusive).
pub const MAX_LAYERS: u32 = 32;

/// Validated multiplicative step for a sweep axis.
/// Must be at least 2, otherwise the axis never advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ScaleFactor(u64);

impl ScaleFactor {
    /// Create a new ScaleFactor with validation.
    pub fn new(field: &'static str, factor: u64) -> Result<Self, HardValidationError> {
        if factor < 2 {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: factor.to_string(),
                reason: "Scale factor must be at least 2 so the sweep terminates".to_string(),
            });
        }
        Ok(Self(factor))
    }

    /// Get the inner value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for ScaleFactor {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new("scale_factor", value)
    }
}

impl From<ScaleFactor> for u64 {
    fn from(factor: ScaleFactor) -> Self {
        factor.0
    }
}

/// Validated repetition count per (size, layer) combination. Must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RepeatCount(u64);

impl RepeatCount {
    pub fn new(count: u64) -> Result<Self, HardValidationError> {
        if count == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "repeat_factor",
                value: "0".to_string(),
                reason: "Repeat factor must be at least 1".to_string(),
            });
        }
        Ok(Self(count))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RepeatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for RepeatCount {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepeatCount> for u64 {
    fn from(count: RepeatCount) -> Self {
        count.0
    }
}

/// Validated parameters for one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepParameters {
    registry_target: String,
    size_scale: ScaleFactor,
    layer_scale: ScaleFactor,
    repeat_count: RepeatCount,
    output_path: PathBuf,
}

impl SweepParameters {
    /// Validate raw values into a sweep description.
    pub fn new(
        registry_target: impl Into<String>,
        size_scale: u64,
        layer_scale: u64,
        repeat_count: u64,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, HardValidationError> {
        let registry_target = registry_target.into();
        let registry_target = registry_target.trim_end_matches('/').to_string();
        if registry_target.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "registry",
                context: "sweep parameters".to_string(),
            });
        }

        let output_path = output_path.into();
        if output_path.as_os_str().is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "output",
                context: "sweep parameters".to_string(),
            });
        }

        Ok(Self {
            registry_target,
            size_scale: ScaleFactor::new("size_scale", size_scale)?,
            layer_scale: ScaleFactor::new("layer_scale", layer_scale)?,
            repeat_count: RepeatCount::new(repeat_count)?,
            output_path,
        })
    }

    pub fn registry_target(&self) -> &str {
        &self.registry_target
    }

    pub fn size_scale(&self) -> ScaleFactor {
        self.size_scale
    }

    pub fn layer_scale(&self) -> ScaleFactor {
        self.layer_scale
    }

    pub fn repeat_count(&self) -> RepeatCount {
        self.repeat_count
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The deterministic iteration order this run will follow.
    pub fn plan(&self) -> SweepPlan {
        SweepPlan::new(self.size_scale, self.layer_scale, self.repeat_count)
    }
}

/// One point of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationSpec {
    pub iteration_index: u64,
    pub size_bytes: u64,
    pub layer_count: u32,
}

/// Timing outcome of one iteration, serialized as a single CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkResult {
    pub iteration_index: u64,
    pub size_bytes: u64,
    pub layer_count: u32,
    pub push_duration_millis: u64,
    pub pull_duration_millis: u64,
}

impl BenchmarkResult {
    pub fn new(spec: IterationSpec, push_duration_millis: u64, pull_duration_millis: u64) -> Self {
        Self {
            iteration_index: spec.iteration_index,
            size_bytes: spec.size_bytes,
            layer_count: spec.layer_count,
            push_duration_millis,
            pull_duration_millis,
        }
    }

    /// `Num,Size,Layers,Push,Pull` row, newline terminated.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.iteration_index,
            self.size_bytes,
            self.layer_count,
            self.push_duration_millis,
            self.pull_duration_millis
        )
    }
}

/// The cross product of size values, layer values, and repeats.
///
/// Size is the outermost axis, layer count the middle, repeat the innermost.
/// Iteration indices form one flat counter over the whole product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    sizes: Vec<u64>,
    layers: Vec<u32>,
    repeats: u64,
}

impl SweepPlan {
    pub fn new(size_scale: ScaleFactor, layer_scale: ScaleFactor, repeats: RepeatCount) -> Self {
        Self {
            sizes: geometric(SIZE_BASE, size_scale.value(), MAX_SIZE),
            layers: geometric(1, layer_scale.value(), u64::from(MAX_LAYERS))
                .into_iter()
                .map(|l| l as u32)
                .collect(),
            repeats: repeats.value(),
        }
    }

    /// Size values in sweep order.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Layer counts in sweep order.
    pub fn layers(&self) -> &[u32] {
        &self.layers
    }

    /// Total number of iterations, and therefore of result rows.
    pub fn len(&self) -> u64 {
        self.sizes.len() as u64 * self.layers.len() as u64 * self.repeats
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = IterationSpec> + '_ {
        let repeats = self.repeats;
        self.sizes
            .iter()
            .flat_map(move |&size_bytes| {
                self.layers.iter().flat_map(move |&layer_count| {
                    (0..repeats).map(move |_| (size_bytes, layer_count))
                })
            })
            .zip(0u64..)
            .map(|((size_bytes, layer_count), iteration_index)| IterationSpec {
                iteration_index,
                size_bytes,
                layer_count,
            })
    }
}

/// `start, start*scale, start*scale^2, ...` while the value stays `<= max`.
/// A multiplication that overflows ends the sequence.
fn geometric(start: u64, scale: u64, max: u64) -> Vec<u64> {
    let mut values = Vec::new();
    let mut current = Some(start);
    while let Some(value) = current.filter(|v| *v <= max) {
        values.push(value);
        current = value.checked_mul(scale);
    }
    values
}
