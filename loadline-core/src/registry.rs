// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Registry client abstraction.
//!
//! The sweep only needs four capabilities from a registry: validate a
//! reference, push an image, pull it back, and drain the pulled content.
//! Transport, authentication and protocol details live in the implementor.

use std::fmt;
use std::io::{self, Write};

use crate::error::LoadlineResult;
use crate::image::{ImageSummary, SyntheticImage};

/// What an export read back from the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub layers: u32,
    pub bytes: u64,
}

impl ExportStats {
    pub fn matches(&self, summary: &ImageSummary) -> bool {
        self.layers == summary.layers && self.bytes == summary.bytes
    }
}

/// A blocking registry client.
pub trait Registry {
    /// Validated reference type.
    type Reference: fmt::Display;
    /// Handle on a pulled image whose content has not been read yet.
    type Pulled;

    /// Validate a raw destination string against registry naming rules.
    fn parse_reference(&self, raw: &str) -> LoadlineResult<Self::Reference>;

    /// Upload every blob and the manifest of `image` to `reference`.
    fn push(&mut self, image: SyntheticImage, reference: &Self::Reference) -> LoadlineResult<()>;

    /// Fetch the image metadata at `reference`.
    fn pull(&mut self, reference: &Self::Reference) -> LoadlineResult<Self::Pulled>;

    /// Read all layer content of `pulled` into `sink`.
    fn export(&mut self, pulled: Self::Pulled, sink: &mut dyn Write) -> LoadlineResult<ExportStats>;
}

/// Writer that counts and discards everything written to it.
#[derive(Debug, Default)]
pub struct CountingSink {
    inner: io::Sink,
    bytes: u64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
