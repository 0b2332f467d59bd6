use super::{Measurement, MeasurementProvider, ProviderError};
use crate::settings::HttpSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Asks a measurement backend for an already computed triple.
///
/// The backend answers `GET <endpoint>` with a JSON object carrying
/// `downloadSpeed`, `uploadSpeed` and `ping`. Values may be numbers or
/// numeric strings.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_settings(settings: &HttpSettings) -> Result<Self> {
        Self::new(
            settings.endpoint.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl MeasurementProvider for HttpProvider {
    async fn measure(&self) -> Result<Measurement, ProviderError> {
        tracing::debug!(endpoint = %self.endpoint, "requesting measurement");
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        parse_measurement(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn parse_measurement(body: &Value) -> Result<Measurement, ProviderError> {
    Ok(Measurement {
        download_mbps: numeric_field(body, "downloadSpeed")?,
        upload_mbps: numeric_field(body, "uploadSpeed")?,
        ping_ms: numeric_field(body, "ping")?,
    })
}

fn numeric_field(body: &Value, key: &str) -> Result<f64, ProviderError> {
    let value = match body.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => {
            return Err(ProviderError::MalformedResponse(format!(
                "missing field `{key}`"
            )))
        }
    };

    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ProviderError::MalformedResponse(format!(
            "field `{key}` is not a non-negative number"
        ))),
    }
}
