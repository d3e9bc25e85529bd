// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `loadline roundtrip` command - Generate random images and push/pull them.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use loadline_core::{
    AbortPolicy, ConfigLoader, HeaderPolicy, LoadlineResult, NamingScheme, RandomImageSource,
    RunConfig, SweepDriver, SweepOptions,
};

use crate::keychain::Keychain;
use crate::oci::OciRegistry;

#[derive(Debug, Args)]
pub struct RoundtripArgs {
    /// Registry repository to push to, e.g. localhost:5000/bench
    pub registry: String,

    /// Initial size = 1k and the scale is applied until reach 1G
    #[arg(short = 'S', long = "size_scale")]
    pub size_scale: Option<u64>,

    /// Initial number of layers = 1 and the scale is applied until reach 32 layers
    #[arg(short = 'L', long = "layer_scale")]
    pub layer_scale: Option<u64>,

    /// For each size+layer combination, how many repeats
    #[arg(short = 'R', long = "repeat_factor")]
    pub repeat_factor: Option<u64>,

    /// The result output file (appended to)
    #[arg(short = 'O', long = "output")]
    pub output: Option<PathBuf>,

    /// When to write the CSV header line [default: always]
    #[arg(long, value_enum)]
    pub header: Option<HeaderArg>,

    /// What to do when an iteration fails [default: abort]
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<OnErrorArg>,

    /// How pushed tags are made unique [default: clock]
    #[arg(long, value_enum)]
    pub naming: Option<NamingArg>,

    /// Talk plain HTTP to the registry [default: false]
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub insecure: Option<bool>,

    /// Compare pulled layer count and bytes with what was pushed [default: true]
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub verify: Option<bool>,

    /// Same as --verify=false
    #[arg(long, conflicts_with = "verify")]
    pub no_verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeaderArg {
    Always,
    IfNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnErrorArg {
    Abort,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    Clock,
    RunScoped,
}

impl RoundtripArgs {
    /// Flags as a config layer; unset flags leave the file or default in place.
    fn overrides(&self) -> RunConfig {
        RunConfig {
            size_scale: self.size_scale,
            layer_scale: self.layer_scale,
            repeat_factor: self.repeat_factor,
            output: self.output.clone(),
            header: self.header.map(|h| match h {
                HeaderArg::Always => HeaderPolicy::Always,
                HeaderArg::IfNew => HeaderPolicy::IfNew,
            }),
            on_error: self.on_error.map(|o| match o {
                OnErrorArg::Abort => AbortPolicy::Abort,
                OnErrorArg::Continue => AbortPolicy::Continue,
            }),
            naming: self.naming.map(|n| match n {
                NamingArg::Clock => NamingScheme::Clock,
                NamingArg::RunScoped => NamingScheme::RunScoped,
            }),
            insecure: self.insecure,
            verify: self.verify.or(self.no_verify.then_some(false)),
        }
    }
}

pub fn execute(config_path: Option<&Path>, args: RoundtripArgs) -> LoadlineResult<()> {
    let file_config = match config_path {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_file(path)?
        }
        None => RunConfig::default(),
    };
    let config = file_config
        .merge(args.overrides())
        .resolve(&args.registry)?;

    let keychain = Keychain::load_default()?;
    let registry = OciRegistry::new(config.params.registry_target(), config.insecure, keychain)?;

    let options = SweepOptions {
        abort_policy: config.on_error,
        header_policy: config.header,
        verify_round_trip: config.verify,
    };

    let mut driver = SweepDriver::new(config.params, RandomImageSource::new(), registry)
        .with_namer(config.naming.namer())
        .with_options(options);

    let summary = driver.run()?;

    println!(
        "✓ {} of {} iterations written to {}",
        summary.completed,
        summary.planned,
        summary.output.display()
    );
    if summary.failed > 0 {
        println!("✗ {} iterations failed", summary.failed);
    }
    Ok(())
}
