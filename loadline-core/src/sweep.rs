// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sweep driver.
//!
//! Walks the (size, layers, repeat) cross product in a fixed order. For each
//! point it generates a fresh image, times a push, times a pull followed by
//! a full export, and appends one CSV row. Iterations run strictly one after
//! another; the first failure ends the run unless the caller opts into
//! [`AbortPolicy::Continue`].

use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LoadlineError, LoadlineResult};
use crate::image::ImageSource;
use crate::naming::{ClockNamer, DestinationNamer};
use crate::registry::{CountingSink, ExportStats, Registry};
use crate::sink::{HeaderPolicy, ResultSink};
use crate::timing::Timer;
use crate::types::{BenchmarkResult, IterationSpec, SweepParameters};

/// What happens when an iteration fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortPolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Log the failure, write no row for it, and move on.
    Continue,
}

/// Knobs that do not change the swept parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    pub abort_policy: AbortPolicy,
    pub header_policy: HeaderPolicy,
    /// Compare exported layer count and bytes with what was generated.
    pub verify_round_trip: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            abort_policy: AbortPolicy::Abort,
            header_policy: HeaderPolicy::Always,
            verify_round_trip: true,
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub planned: u64,
    pub completed: u64,
    pub failed: u64,
    pub output: PathBuf,
}

pub struct SweepDriver<S, R> {
    params: SweepParameters,
    source: S,
    registry: R,
    namer: Box<dyn DestinationNamer>,
    options: SweepOptions,
}

impl<S: ImageSource, R: Registry> SweepDriver<S, R> {
    pub fn new(params: SweepParameters, source: S, registry: R) -> Self {
        Self {
            params,
            source,
            registry,
            namer: Box::new(ClockNamer),
            options: SweepOptions::default(),
        }
    }

    pub fn with_namer(mut self, namer: Box<dyn DestinationNamer>) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn params(&self) -> &SweepParameters {
        &self.params
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Run the whole sweep against the configured output file.
    ///
    /// Rows are on disk as soon as their iteration finishes, so an error
    /// returned from here leaves every earlier row in place.
    pub fn run(&mut self) -> LoadlineResult<SweepSummary> {
        let mut sink = ResultSink::open(self.params.output_path())?;
        let summary = self.run_with_sink(&mut sink)?;
        sink.close()?;
        Ok(summary)
    }

    /// Run the whole sweep into an already open sink.
    pub fn run_with_sink<W: Write>(
        &mut self,
        sink: &mut ResultSink<W>,
    ) -> LoadlineResult<SweepSummary> {
        let plan = self.params.plan();
        let planned = plan.len();

        tracing::info!(
            registry = %self.params.registry_target(),
            output = %sink.path().display(),
            sizes = plan.sizes().len(),
            layers = plan.layers().len(),
            repeats = self.params.repeat_count().value(),
            iterations = planned,
            "Starting sweep"
        );

        sink.apply_header_policy(self.options.header_policy)?;

        let mut completed = 0u64;
        let mut failed = 0u64;

        for spec in plan.iter() {
            let span = tracing::info_span!(
                "iteration",
                index = spec.iteration_index,
                size = spec.size_bytes,
                layers = spec.layer_count
            );
            let _guard = span.enter();

            match self.run_iteration(spec) {
                Ok(result) => {
                    sink.write_result(&result)?;
                    completed += 1;
                    tracing::info!(
                        push_ms = result.push_duration_millis,
                        pull_ms = result.pull_duration_millis,
                        "Iteration {} of {} complete",
                        spec.iteration_index + 1,
                        planned
                    );
                }
                Err(e) => match self.options.abort_policy {
                    AbortPolicy::Abort => return Err(e.in_iteration(spec.iteration_index)),
                    AbortPolicy::Continue => {
                        failed += 1;
                        tracing::warn!(
                            operation = e.operation(),
                            error = %e,
                            "Iteration failed, continuing"
                        );
                    }
                },
            }
        }

        tracing::info!(completed, failed, "Sweep finished");

        Ok(SweepSummary {
            planned,
            completed,
            failed,
            output: sink.path().to_path_buf(),
        })
    }

    /// Execute one point of the sweep: name, generate, push, pull, export.
    pub fn run_iteration(&mut self, spec: IterationSpec) -> LoadlineResult<BenchmarkResult> {
        let raw = self
            .namer
            .destination(self.params.registry_target(), spec.iteration_index);
        let reference = self.registry.parse_reference(&raw)?;

        let image = self.source.generate(spec.size_bytes, spec.layer_count)?;
        let expected = image.summary();
        tracing::debug!(
            reference = %reference,
            blob_bytes = expected.bytes,
            "Generated image"
        );

        let timer = Timer::start();
        self.registry.push(image, &reference)?;
        let push_millis = timer.stop_millis();

        let timer = Timer::start();
        let pulled = self.registry.pull(&reference)?;
        let mut drain = CountingSink::new();
        let stats = self.registry.export(pulled, &mut drain)?;
        let pull_millis = timer.stop_millis();

        let actual = ExportStats {
            layers: stats.layers,
            bytes: drain.bytes(),
        };
        if self.options.verify_round_trip && !actual.matches(&expected) {
            return Err(LoadlineError::RoundTripMismatch {
                reference: reference.to_string(),
                expected_layers: expected.layers,
                expected_bytes: expected.bytes,
                actual_layers: actual.layers,
                actual_bytes: actual.bytes,
            });
        }

        Ok(BenchmarkResult::new(spec, push_millis, pull_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{RandomImageSource, SyntheticImage};
    use crate::naming::RunScopedNamer;
    use std::collections::HashMap;

    /// Registry that keeps pushed images in memory.
    #[derive(Default)]
    struct MemoryRegistry {
        images: HashMap<String, SyntheticImage>,
        drop_last_layer: bool,
    }

    impl Registry for MemoryRegistry {
        type Reference = String;
        type Pulled = SyntheticImage;

        fn parse_reference(&self, raw: &str) -> LoadlineResult<String> {
            Ok(raw.to_string())
        }

        fn push(&mut self, image: SyntheticImage, reference: &String) -> LoadlineResult<()> {
            self.images.insert(reference.clone(), image);
            Ok(())
        }

        fn pull(&mut self, reference: &String) -> LoadlineResult<SyntheticImage> {
            self.images
                .get(reference)
                .cloned()
                .ok_or_else(|| LoadlineError::Pull {
                    reference: reference.clone(),
                    reason: "manifest unknown".to_string(),
                })
        }

        fn export(
            &mut self,
            pulled: SyntheticImage,
            sink: &mut dyn Write,
        ) -> LoadlineResult<ExportStats> {
            let mut layers = pulled.layers().to_vec();
            if self.drop_last_layer {
                layers.pop();
            }
            let mut bytes = 0;
            for layer in &layers {
                sink.write_all(layer.data()).unwrap();
                bytes += layer.len();
            }
            Ok(ExportStats {
                layers: layers.len() as u32,
                bytes,
            })
        }
    }

    fn params(size_scale: u64) -> SweepParameters {
        SweepParameters::new("localhost:5000/bench", size_scale, 32, 1, "memory").unwrap()
    }

    #[test]
    fn test_iteration_round_trip() {
        let mut driver = SweepDriver::new(
            params(1024),
            RandomImageSource::seeded(3),
            MemoryRegistry::default(),
        )
        .with_namer(Box::new(RunScopedNamer::with_run_id("run")));

        let spec = IterationSpec {
            iteration_index: 5,
            size_bytes: 2048,
            layer_count: 2,
        };
        let result = driver.run_iteration(spec).unwrap();
        assert_eq!(result.iteration_index, 5);
        assert_eq!(result.size_bytes, 2048);
        assert_eq!(result.layer_count, 2);
        assert!(driver
            .registry()
            .images
            .contains_key("localhost:5000/bench/loadline:run-5"));
    }

    #[test]
    fn test_round_trip_mismatch_detected() {
        let registry = MemoryRegistry {
            drop_last_layer: true,
            ..MemoryRegistry::default()
        };
        let mut driver = SweepDriver::new(params(1024), RandomImageSource::seeded(3), registry);

        let spec = IterationSpec {
            iteration_index: 0,
            size_bytes: 1024,
            layer_count: 2,
        };
        let err = driver.run_iteration(spec).unwrap_err();
        assert!(matches!(
            err,
            LoadlineError::RoundTripMismatch {
                expected_layers: 2,
                actual_layers: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_verification_can_be_disabled() {
        let registry = MemoryRegistry {
            drop_last_layer: true,
            ..MemoryRegistry::default()
        };
        let mut driver = SweepDriver::new(params(1024), RandomImageSource::seeded(3), registry)
            .with_options(SweepOptions {
                verify_round_trip: false,
                ..SweepOptions::default()
            });

        let spec = IterationSpec {
            iteration_index: 0,
            size_bytes: 1024,
            layer_count: 2,
        };
        assert!(driver.run_iteration(spec).is_ok());
    }

    #[test]
    fn test_run_with_memory_sink() {
        let mut driver = SweepDriver::new(
            params(1024),
            RandomImageSource::seeded(9),
            MemoryRegistry::default(),
        );
        // Keep the sweep small: only the 1 KiB size is exercised here.
        let mut sink = ResultSink::from_writer(Vec::new(), "memory", true);
        let spec = driver.params().plan().iter().next().unwrap();
        let result = driver.run_iteration(spec).unwrap();
        sink.write_result(&result).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert!(out.starts_with("0,1024,1,"));
    }
}
