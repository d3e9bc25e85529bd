// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for loadline.
//!
//! Explicit enum error types, one variant per failing operation.
//! No `Box<dyn Error>`, no `anyhow::Result` in the library.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a benchmark run.
/// Every variant names the operation and the reference or path it failed on.
#[derive(Debug, Error)]
pub enum LoadlineError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Parameters
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Result Sink Errors
    // =========================================================================
    #[error("Failed to open output file {path}: {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Per-Iteration Errors - Terminal Under the Default Abort Policy
    // =========================================================================
    #[error("Parsing reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Generating image ({size_bytes} bytes, {layer_count} layers): {reason}")]
    ImageGeneration {
        size_bytes: u64,
        layer_count: u32,
        reason: String,
    },

    #[error("Writing image {reference}: {reason}")]
    Push { reference: String, reason: String },

    #[error("Pulling image {reference}: {reason}")]
    Pull { reference: String, reason: String },

    #[error("Exporting image {reference}: {reason}")]
    Export { reference: String, reason: String },

    #[error(
        "Round trip mismatch for {reference}: pushed {expected_layers} layers / {expected_bytes} bytes, \
         pulled {actual_layers} layers / {actual_bytes} bytes"
    )]
    RoundTripMismatch {
        reference: String,
        expected_layers: u32,
        expected_bytes: u64,
        actual_layers: u32,
        actual_bytes: u64,
    },

    /// Any of the above, tagged with the sweep iteration it ended.
    #[error("Iteration {index}: {source}")]
    Iteration {
        index: u64,
        #[source]
        source: Box<LoadlineError>,
    },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LoadlineError {
    /// Attach the iteration index the error occurred in.
    pub fn in_iteration(self, index: u64) -> Self {
        LoadlineError::Iteration {
            index,
            source: Box::new(self),
        }
    }

    /// The underlying error with any iteration tag removed.
    pub fn root(&self) -> &LoadlineError {
        match self {
            LoadlineError::Iteration { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short name of the operation that failed, used as a structured log field.
    pub fn operation(&self) -> &'static str {
        match self {
            LoadlineError::HardValidation(_)
            | LoadlineError::ConfigNotFound { .. }
            | LoadlineError::ConfigParse { .. } => "config",
            LoadlineError::OutputOpen { .. } => "open_output",
            LoadlineError::OutputWrite { .. } => "write_output",
            LoadlineError::InvalidReference { .. } => "parse_reference",
            LoadlineError::ImageGeneration { .. } => "generate",
            LoadlineError::Push { .. } => "push",
            LoadlineError::Pull { .. } => "pull",
            LoadlineError::Export { .. } => "export",
            LoadlineError::RoundTripMismatch { .. } => "verify",
            LoadlineError::Io { .. } => "io",
            LoadlineError::Iteration { source, .. } => source.operation(),
        }
    }
}

/// Hard validation errors reject a run before anything is pushed.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias using LoadlineError.
pub type LoadlineResult<T> = Result<T, LoadlineError>;
