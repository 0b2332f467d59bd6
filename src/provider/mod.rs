//! Measurement providers.
//!
//! A provider is asked for exactly one result triple per run. The controller
//! never cares how the numbers were obtained, so the stub and the HTTP client
//! are interchangeable behind [`MeasurementProvider`].

pub mod http;
pub mod stub;

use crate::settings::{ProviderKind, Settings};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpProvider;
pub use stub::StubProvider;

/// One download/upload/ping triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to measurement backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("measurement backend answered with status {0}")]
    Status(u16),
    #[error("malformed measurement response: {0}")]
    MalformedResponse(String),
    #[error("measurement did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("measurement provider crashed: {0}")]
    Crashed(String),
}

#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    /// Resolves once with a full triple or an error.
    async fn measure(&self) -> Result<Measurement, ProviderError>;

    fn name(&self) -> &str;
}

pub fn build_provider(settings: &Settings) -> Result<Arc<dyn MeasurementProvider>> {
    let provider: Arc<dyn MeasurementProvider> = match settings.provider {
        ProviderKind::Stub => Arc::new(StubProvider::from_settings(&settings.stub)),
        ProviderKind::Http => Arc::new(HttpProvider::from_settings(&settings.http)?),
    };
    tracing::debug!(provider = provider.name(), "measurement provider ready");
    Ok(provider)
}
