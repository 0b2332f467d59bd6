use super::{Measurement, MeasurementProvider, ProviderError};
use crate::settings::StubSettings;
use async_trait::async_trait;
use std::time::Duration;

/// Waits a fixed delay, then reports a fixed triple. Never fails.
pub struct StubProvider {
    delay: Duration,
    result: Measurement,
}

impl StubProvider {
    pub fn new(delay: Duration, result: Measurement) -> Self {
        Self { delay, result }
    }

    pub fn from_settings(settings: &StubSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.delay_ms),
            Measurement {
                download_mbps: settings.download_mbps,
                upload_mbps: settings.upload_mbps,
                ping_ms: settings.ping_ms,
            },
        )
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::from_settings(&StubSettings::default())
    }
}

#[async_trait]
impl MeasurementProvider for StubProvider {
    async fn measure(&self) -> Result<Measurement, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.result)
    }

    fn name(&self) -> &str {
        "stub"
    }
}
