// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! loadline Core Library
//!
//! Push/pull latency benchmarking against OCI registries. Provides the
//! sweep driver, the append-only CSV result sink, synthetic image
//! generation, destination naming, and the registry abstraction the
//! driver pushes and pulls through.

pub mod config;
pub mod error;
pub mod image;
pub mod naming;
pub mod registry;
pub mod sink;
pub mod sweep;
pub mod timing;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, ResolvedConfig, RunConfig};
pub use error::{HardValidationError, LoadlineError, LoadlineResult};
pub use image::{ImageSource, ImageSummary, RandomImageSource, SyntheticImage, SyntheticLayer};
pub use naming::{ClockNamer, DestinationNamer, NamingScheme, RunScopedNamer};
pub use registry::{CountingSink, ExportStats, Registry};
pub use sink::{HeaderPolicy, ResultSink, CSV_HEADER};
pub use sweep::{AbortPolicy, SweepDriver, SweepOptions, SweepSummary};
pub use types::{BenchmarkResult, IterationSpec, SweepParameters, SweepPlan};
