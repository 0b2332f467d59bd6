//! Runs one session without the terminal UI and prints the outcome.

use crate::provider::Measurement;
use crate::session::{Controller, Status};
use anyhow::{bail, Result};
use serde::Serialize;
use std::io::Write;

const PROGRESS_LOG_EVERY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub provider: &'a str,
    pub status: Status,
    pub progress: u8,
    #[serde(flatten)]
    pub result: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Drives the controller until the run leaves `Running`.
pub async fn run_once(controller: &mut Controller) -> Status {
    if !controller.start() {
        return controller.session().status();
    }

    let mut next_mark = PROGRESS_LOG_EVERY;
    while let Some(status) = controller.next_event().await {
        let progress = controller.session().progress();
        if progress >= next_mark {
            tracing::info!(progress, "measuring");
            next_mark = progress - progress % PROGRESS_LOG_EVERY + PROGRESS_LOG_EVERY;
        }
        if status != Status::Running {
            break;
        }
    }

    controller.session().status()
}

pub fn report(controller: &Controller) -> Report<'_> {
    let session = controller.session();
    Report {
        provider: controller.provider_name(),
        status: session.status(),
        progress: session.progress(),
        result: session.result().copied(),
        error: session.error(),
    }
}

pub fn write_report<W: Write>(
    out: &mut W,
    report: &Report<'_>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => match (report.result, report.error) {
            (Some(m), _) => {
                writeln!(out, "Download: {:.2} Mbps", m.download_mbps)?;
                writeln!(out, "Upload:   {:.2} Mbps", m.upload_mbps)?;
                writeln!(out, "Ping:     {:.0} ms", m.ping_ms)?;
            }
            (None, Some(error)) => writeln!(out, "Measurement failed: {error}")?,
            (None, None) => writeln!(out, "No result ({:?})", report.status)?,
        },
    }
    Ok(())
}

pub async fn run(mut controller: Controller, format: OutputFormat) -> Result<()> {
    let status = run_once(&mut controller).await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &report(&controller), format)?;
    controller.teardown();

    if status != Status::Complete {
        bail!("speed test ended in state {status:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MeasurementProvider, ProviderError, StubProvider};
    use crate::session::ControllerConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl MeasurementProvider for Unreachable {
        async fn measure(&self) -> Result<Measurement, ProviderError> {
            Err(ProviderError::Status(502))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn stub_controller() -> Controller {
        Controller::new(Arc::new(StubProvider::default()), ControllerConfig::default())
    }

    fn render(controller: &Controller, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, &report(controller), format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn prints_stub_result_as_text() {
        let mut ctl = stub_controller();

        assert_eq!(run_once(&mut ctl).await, Status::Complete);

        let text = render(&ctl, OutputFormat::Text);
        assert!(text.contains("Download: 2.00 Mbps"));
        assert!(text.contains("Upload:   4.00 Mbps"));
        assert!(text.contains("Ping:     19 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn json_report_flattens_result() {
        let mut ctl = stub_controller();
        run_once(&mut ctl).await;

        let json: serde_json::Value =
            serde_json::from_str(&render(&ctl, OutputFormat::Json)).unwrap();
        assert_eq!(json["provider"], "stub");
        assert_eq!(json["status"], "complete");
        assert_eq!(json["download_mbps"], 2.0);
        assert_eq!(json["ping_ms"], 19.0);
        assert!(json.get("error").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_and_returns_error() {
        let mut ctl = Controller::new(Arc::new(Unreachable), ControllerConfig::default());
        assert_eq!(run_once(&mut ctl).await, Status::Failed);
        assert!(render(&ctl, OutputFormat::Text).contains("Measurement failed"));

        let ctl = Controller::new(Arc::new(Unreachable), ControllerConfig::default());
        assert!(run(ctl, OutputFormat::Json).await.is_err());
    }
}
