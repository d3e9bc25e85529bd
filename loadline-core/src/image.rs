// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Synthetic image generation.
//!
//! Each layer is an uncompressed tar holding one file of random bytes, so
//! every generated image is distinct and content addressable. The requested
//! size is split across the layers.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{LoadlineError, LoadlineResult};

/// OCI media type of an uncompressed layer tarball.
pub const LAYER_MEDIA_TYPE: &str = "application/vnd.oci.image.layer.v1.tar";
/// OCI media type of the image configuration blob.
pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";

const TAR_BLOCK: usize = 512;

/// Produces synthetic images on demand.
pub trait ImageSource {
    fn generate(&mut self, size_bytes: u64, layer_count: u32) -> LoadlineResult<SyntheticImage>;
}

/// A single generated layer blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticLayer {
    data: Vec<u8>,
    digest: String,
}

impl SyntheticLayer {
    pub fn from_data(data: Vec<u8>) -> Self {
        let digest = sha256_digest(&data);
        Self { data, digest }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// `sha256:<hex>` of the blob.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Layer count and byte total of an image, compared after the round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSummary {
    pub layers: u32,
    pub bytes: u64,
}

/// A generated image: ordered layers plus its config blob.
#[derive(Debug, Clone)]
pub struct SyntheticImage {
    layers: Vec<SyntheticLayer>,
    config: Vec<u8>,
}

impl SyntheticImage {
    pub fn new(layers: Vec<SyntheticLayer>, config: Vec<u8>) -> Self {
        Self { layers, config }
    }

    pub fn layers(&self) -> &[SyntheticLayer] {
        &self.layers
    }

    /// Raw OCI image configuration JSON.
    pub fn config(&self) -> &[u8] {
        &self.config
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Sum of all layer blob sizes.
    pub fn total_bytes(&self) -> u64 {
        self.layers.iter().map(SyntheticLayer::len).sum()
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            layers: self.layer_count(),
            bytes: self.total_bytes(),
        }
    }

    pub fn into_parts(self) -> (Vec<SyntheticLayer>, Vec<u8>) {
        (self.layers, self.config)
    }
}

#[derive(Serialize)]
struct ImageConfig<'a> {
    architecture: &'static str,
    os: &'static str,
    rootfs: RootFs<'a>,
}

#[derive(Serialize)]
struct RootFs<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    diff_ids: Vec<&'a str>,
}

/// Random image generator backed by a seedable RNG.
pub struct RandomImageSource {
    rng: StdRng,
}

impl RandomImageSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One tar archive holding a single file of random bytes. The random
    /// payload is written directly into the archive buffer.
    fn layer(&mut self, payload_len: usize) -> std::io::Result<SyntheticLayer> {
        let name = format!("random_file_{}.txt", self.rng.gen::<u64>());
        let mut header = tar::Header::new_gnu();
        header.set_path(&name)?;
        header.set_size(payload_len as u64);
        header.set_mode(0o400);
        header.set_cksum();

        // header, payload padded to a block, two zero blocks
        let archive_len = TAR_BLOCK + payload_len.div_ceil(TAR_BLOCK) * TAR_BLOCK + 2 * TAR_BLOCK;
        let mut data = Vec::with_capacity(archive_len);
        data.extend_from_slice(header.as_bytes());
        data.resize(TAR_BLOCK + payload_len, 0);
        self.rng.fill_bytes(&mut data[TAR_BLOCK..]);
        data.resize(archive_len, 0);

        Ok(SyntheticLayer::from_data(data))
    }
}

impl Default for RandomImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSource for RandomImageSource {
    fn generate(&mut self, size_bytes: u64, layer_count: u32) -> LoadlineResult<SyntheticImage> {
        let fail = |reason: String| LoadlineError::ImageGeneration {
            size_bytes,
            layer_count,
            reason,
        };

        let payloads = split_payload(size_bytes, layer_count)
            .ok_or_else(|| fail("layer count must be at least 1".to_string()))?;

        let mut layers = Vec::with_capacity(payloads.len());
        for payload_len in payloads {
            let payload_len = usize::try_from(payload_len)
                .map_err(|_| fail(format!("layer of {} bytes exceeds address space", payload_len)))?;
            let layer = self
                .layer(payload_len)
                .map_err(|e| fail(format!("building layer tarball: {}", e)))?;
            layers.push(layer);
        }

        let config = ImageConfig {
            architecture: "amd64",
            os: "linux",
            rootfs: RootFs {
                kind: "layers",
                diff_ids: layers.iter().map(SyntheticLayer::digest).collect(),
            },
        };
        let config =
            serde_json::to_vec(&config).map_err(|e| fail(format!("encoding config: {}", e)))?;

        tracing::trace!(size_bytes, layer_count, "Generated synthetic image");
        Ok(SyntheticImage::new(layers, config))
    }
}

/// Payload size of each layer: an even split with the remainder spread over
/// the first layers, never less than one byte. `None` for zero layers.
pub fn split_payload(size_bytes: u64, layer_count: u32) -> Option<Vec<u64>> {
    if layer_count == 0 {
        return None;
    }
    let layers = u64::from(layer_count);
    let base = size_bytes / layers;
    let remainder = size_bytes % layers;
    Some(
        (0..layers)
            .map(|i| (base + u64::from(i < remainder)).max(1))
            .collect(),
    )
}

/// `sha256:<hex>` digest of a blob.
pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_payload_even() {
        assert_eq!(split_payload(1024, 4).unwrap(), vec![256; 4]);
    }

    #[test]
    fn test_split_payload_remainder() {
        let parts = split_payload(10_240, 3).unwrap();
        assert_eq!(parts, vec![3414, 3413, 3413]);
        assert_eq!(parts.iter().sum::<u64>(), 10_240);
    }

    #[test]
    fn test_split_payload_minimum_one_byte() {
        assert_eq!(split_payload(2, 4).unwrap(), vec![1, 1, 1, 1]);
        assert!(split_payload(1024, 0).is_none());
    }

    #[test]
    fn test_generate_layers_and_config() {
        let mut source = RandomImageSource::seeded(7);
        let image = source.generate(4096, 4).unwrap();

        assert_eq!(image.layer_count(), 4);
        // Each layer carries at least its payload plus tar framing.
        assert!(image.total_bytes() > 4096);
        for layer in image.layers() {
            assert!(layer.digest().starts_with("sha256:"));
            assert_eq!(layer.digest(), sha256_digest(layer.data()));
        }

        let config: serde_json::Value = serde_json::from_slice(image.config()).unwrap();
        assert_eq!(config["rootfs"]["type"], "layers");
        assert_eq!(config["rootfs"]["diff_ids"].as_array().unwrap().len(), 4);
        assert_eq!(config["os"], "linux");
    }

    #[test]
    fn test_layer_is_readable_tar() {
        let mut source = RandomImageSource::seeded(1);
        let image = source.generate(1000, 1).unwrap();
        let mut archive = tar::Archive::new(image.layers()[0].data());
        let entries: Vec<_> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().header().size().unwrap())
            .collect();
        assert_eq!(entries, vec![1000]);
    }

    #[test]
    fn test_layer_is_one_exact_archive() {
        let mut source = RandomImageSource::seeded(5);
        let layer = source.layer(1000).unwrap();
        // header + 1000 bytes padded to 1024 + end-of-archive marker
        assert_eq!(layer.len(), 512 + 1024 + 1024);
        assert!(layer.data()[512 + 1000..].iter().all(|&b| b == 0));

        let mut archive = tar::Archive::new(layer.data());
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        assert!(path.starts_with("random_file_") && path.ends_with(".txt"));
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_empty_payload_layer() {
        let mut source = RandomImageSource::seeded(5);
        let layer = source.layer(0).unwrap();
        assert_eq!(layer.len(), 512 + 1024);
    }

    #[test]
    fn test_images_are_distinct() {
        let mut source = RandomImageSource::new();
        let a = source.generate(1024, 1).unwrap();
        let b = source.generate(1024, 1).unwrap();
        assert_ne!(a.layers()[0].digest(), b.layers()[0].digest());
    }

    #[test]
    fn test_zero_layers_rejected() {
        let mut source = RandomImageSource::seeded(0);
        let err = source.generate(1024, 0).unwrap_err();
        assert!(matches!(err, LoadlineError::ImageGeneration { .. }));
    }
}
