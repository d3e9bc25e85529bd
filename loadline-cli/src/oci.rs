// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OCI distribution registry client.
//!
//! Wraps `oci_client::Client` behind the blocking [`Registry`] trait. A
//! private current-thread runtime drives each request to completion before
//! the call returns, so the sweep never overlaps two registry operations.

use std::io::Write;

use futures::StreamExt;
use loadline_core::image::{CONFIG_MEDIA_TYPE, LAYER_MEDIA_TYPE};
use loadline_core::{ExportStats, LoadlineError, LoadlineResult, Registry, SyntheticImage};
use oci_client::client::{ClientConfig, ClientProtocol, Config, ImageLayer};
use oci_client::manifest::OciImageManifest;
use oci_client::{Client, Reference};
use tokio::runtime::Runtime;

use crate::keychain::Keychain;

/// A manifest fetched by [`OciRegistry::pull`], not yet drained.
pub struct PulledManifest {
    reference: Reference,
    manifest: OciImageManifest,
    digest: String,
}

pub struct OciRegistry {
    client: Client,
    keychain: Keychain,
    runtime: Runtime,
}

impl OciRegistry {
    /// Build a client for `target`. Plain HTTP is used when `insecure` is
    /// set or the target is a loopback registry.
    pub fn new(target: &str, insecure: bool, keychain: Keychain) -> LoadlineResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LoadlineError::Io {
                context: "starting registry client runtime",
                source: e,
            })?;

        let protocol = protocol_for(target, insecure);
        tracing::debug!(registry = %target, insecure, "Configured registry client");

        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        Ok(Self {
            client,
            keychain,
            runtime,
        })
    }
}

impl Registry for OciRegistry {
    type Reference = Reference;
    type Pulled = PulledManifest;

    fn parse_reference(&self, raw: &str) -> LoadlineResult<Reference> {
        raw.parse::<Reference>()
            .map_err(|e| LoadlineError::InvalidReference {
                reference: raw.to_string(),
                reason: e.to_string(),
            })
    }

    fn push(&mut self, image: SyntheticImage, reference: &Reference) -> LoadlineResult<()> {
        let auth = self.keychain.auth_for(reference.resolve_registry());
        let (layers, config) = image.into_parts();
        let layers: Vec<ImageLayer> = layers
            .into_iter()
            .map(|layer| ImageLayer::new(layer.into_data(), LAYER_MEDIA_TYPE.to_string(), None))
            .collect();
        let config = Config::new(config, CONFIG_MEDIA_TYPE.to_string(), None);

        let response = self
            .runtime
            .block_on(self.client.push(reference, &layers, config, &auth, None))
            .map_err(|e| LoadlineError::Push {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(manifest = %response.manifest_url, "Pushed image");
        Ok(())
    }

    fn pull(&mut self, reference: &Reference) -> LoadlineResult<PulledManifest> {
        let auth = self.keychain.auth_for(reference.resolve_registry());
        let (manifest, digest) = self
            .runtime
            .block_on(self.client.pull_image_manifest(reference, &auth))
            .map_err(|e| LoadlineError::Pull {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        Ok(PulledManifest {
            reference: reference.clone(),
            manifest,
            digest,
        })
    }

    fn export(&mut self, pulled: PulledManifest, sink: &mut dyn Write) -> LoadlineResult<ExportStats> {
        let PulledManifest {
            reference,
            manifest,
            digest,
        } = pulled;
        let fail = |reason: String| LoadlineError::Export {
            reference: reference.to_string(),
            reason,
        };

        let client = &self.client;
        let bytes = self.runtime.block_on(async {
            let mut total = 0u64;
            for layer in &manifest.layers {
                let mut stream = client
                    .pull_blob_stream(&reference, layer)
                    .await
                    .map_err(|e| fail(format!("layer {}: {}", layer.digest, e)))?;
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| fail(format!("layer {}: {}", layer.digest, e)))?;
                    sink.write_all(&chunk)
                        .map_err(|e| fail(format!("draining layer {}: {}", layer.digest, e)))?;
                    total += chunk.len() as u64;
                }
            }
            Ok::<_, LoadlineError>(total)
        })?;

        tracing::debug!(manifest_digest = %digest, layers = manifest.layers.len(), bytes, "Exported image");
        Ok(ExportStats {
            layers: manifest.layers.len() as u32,
            bytes,
        })
    }
}

/// HTTPS everywhere, except plain HTTP for `--insecure` or loopback targets.
pub fn protocol_for(target: &str, insecure: bool) -> ClientProtocol {
    if insecure {
        return ClientProtocol::Http;
    }
    let host = target.split('/').next().unwrap_or(target);
    let hostname = host.split(':').next().unwrap_or(host);
    if hostname == "localhost" || hostname.starts_with("127.") {
        ClientProtocol::HttpsExcept(vec![host.to_string()])
    } else {
        ClientProtocol::Https
    }
}
