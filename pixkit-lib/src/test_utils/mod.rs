//! Test utilities for PIX validation testing.
//!
//! This module is only available with the `test-utils` feature or in test
//! builds. It provides in-memory collaborator doubles so the full pipeline
//! can be exercised without network access or raster codecs.

pub mod fixtures;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::PixError;
use crate::fetch::RemoteTokenFetch;
use crate::qr::{QrDecoder, QrErrorCorrection, QrRenderer};
use crate::Result;

/// In-memory [`RemoteTokenFetch`] serving canned bodies keyed by the exact
/// URL the pipeline asks for.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, String>,
}

impl StaticFetcher {
    /// Creates a fetcher with no responses; every fetch fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a body for `url` (builder style).
    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    fn lookup(&self, url: &str) -> Result<String> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| PixError::remote_fetch_failed(url, "no mock response registered"))
    }
}

#[async_trait]
impl RemoteTokenFetch for StaticFetcher {
    async fn fetch_token(&self, url: &str) -> Result<String> {
        self.lookup(url)
    }

    async fn fetch_key_set(&self, url: &str) -> Result<String> {
        self.lookup(url)
    }
}

/// [`QrDecoder`] double returning a fixed list of decoded texts.
#[derive(Clone, Debug, Default)]
pub struct StubQrDecoder {
    texts: Vec<String>,
}

impl StubQrDecoder {
    /// Creates a decoder that "finds" the given texts in any image.
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts }
    }
}

impl QrDecoder for StubQrDecoder {
    fn decode(&self, _image: &[u8]) -> Result<Vec<String>> {
        Ok(self.texts.clone())
    }
}

/// [`QrRenderer`] double returning fixed bytes and counting invocations.
#[derive(Debug, Default)]
pub struct StubQrRenderer {
    renders: std::cell::Cell<usize>,
}

impl StubQrRenderer {
    /// The bytes every render returns.
    pub const STUB_BYTES: &'static [u8] = b"stub-png-bytes";

    /// How many times the renderer was invoked.
    pub fn render_count(&self) -> usize {
        self.renders.get()
    }
}

impl QrRenderer for StubQrRenderer {
    fn render_png(
        &self,
        _text: &str,
        _min_size: u32,
        _level: QrErrorCorrection,
    ) -> Result<Vec<u8>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Self::STUB_BYTES.to_vec())
    }
}
