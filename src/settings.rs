use crate::session::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "speedring.toml";

const TICK_MIN_MS: u64 = 10;
const TICK_MAX_MS: u64 = 200;
const STEP_MAX: u8 = 10;
// Upper bound for tick intervals read from files or the environment.
const TICK_CEILING_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Stub,
    Http,
}

impl ProviderKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stub" => Some(ProviderKind::Stub),
            "http" => Some(ProviderKind::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubSettings {
    pub delay_ms: u64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}

impl Default for StubSettings {
    fn default() -> Self {
        Self {
            delay_ms: 3000,
            download_mbps: 2.0,
            upload_mbps: 4.0,
            ping_ms: 19.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/speedtest".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Static text for the details panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDetails {
    pub server: String,
    pub isp: String,
    pub connection: String,
}

impl Default for ServerDetails {
    fn default() -> Self {
        Self {
            server: "New York City, NY".to_string(),
            isp: "Example Internet Provider".to_string(),
            connection: "Fiber".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tick_interval_ms: u64,
    pub progress_step: u8,
    pub fill_progress_on_complete: bool,
    /// Zero disables the timeout.
    pub measure_timeout_secs: u64,
    pub provider: ProviderKind,
    pub stub: StubSettings,
    pub http: HttpSettings,
    pub details: ServerDetails,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            progress_step: 1,
            fill_progress_on_complete: false,
            measure_timeout_secs: 30,
            provider: ProviderKind::Stub,
            stub: StubSettings::default(),
            http: HttpSettings::default(),
            details: ServerDetails::default(),
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tick_interval: Duration::from_millis(
                self.tick_interval_ms.clamp(1, TICK_CEILING_MS),
            ),
            progress_step: self.progress_step.max(1),
            fill_progress_on_complete: self.fill_progress_on_complete,
            measure_timeout: (self.measure_timeout_secs > 0)
                .then(|| Duration::from_secs(self.measure_timeout_secs)),
        }
    }

    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, SettingsError> {
        toml::from_str(raw).map_err(|source| SettingsError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Environment overrides, looked up through `var` so tests need not touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("SPEEDRING_PROVIDER") {
            match ProviderKind::parse(&v) {
                Some(kind) => self.provider = kind,
                None => tracing::warn!(value = %v, "ignoring unknown SPEEDRING_PROVIDER"),
            }
        }
        if let Some(v) = var("SPEEDRING_HTTP_ENDPOINT") {
            self.http.endpoint = v;
        }
        if let Some(v) = var("SPEEDRING_TICK_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.tick_interval_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring non-numeric SPEEDRING_TICK_MS"),
            }
        }
    }

    pub fn adjust(&mut self, field: SettingsField, increase: bool) {
        match (field, increase) {
            (SettingsField::TickInterval, true) => {
                self.tick_interval_ms =
                    self.tick_interval_ms.saturating_add(10).min(TICK_MAX_MS);
            }
            (SettingsField::TickInterval, false) => {
                self.tick_interval_ms = self.tick_interval_ms.saturating_sub(10).max(TICK_MIN_MS);
            }
            (SettingsField::ProgressStep, true) => {
                self.progress_step = self.progress_step.saturating_add(1).min(STEP_MAX);
            }
            (SettingsField::ProgressStep, false) => {
                self.progress_step = self.progress_step.saturating_sub(1).max(1);
            }
            (SettingsField::FillOnComplete, _) => {
                self.fill_progress_on_complete = !self.fill_progress_on_complete;
            }
        }
    }
}

/// Loads settings from `path` (must exist) or, failing that, from
/// `speedring.toml` in the working directory if present, then applies
/// environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut settings = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
                path: path.display().to_string(),
                source,
            })?;
            Settings::from_toml(&raw, &path.display().to_string())?
        }
        None => match std::fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(raw) => Settings::from_toml(&raw, DEFAULT_CONFIG_FILE)?,
            Err(_) => Settings::default(),
        },
    };

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    TickInterval,
    ProgressStep,
    FillOnComplete,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::TickInterval => SettingsField::ProgressStep,
            SettingsField::ProgressStep => SettingsField::FillOnComplete,
            SettingsField::FillOnComplete => SettingsField::TickInterval,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::TickInterval => SettingsField::FillOnComplete,
            SettingsField::ProgressStep => SettingsField::TickInterval,
            SettingsField::FillOnComplete => SettingsField::ProgressStep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_stub_behavior() {
        let settings = Settings::default();
        let config = settings.controller_config();

        assert_eq!(config.tick_interval, Duration::from_millis(30));
        assert_eq!(config.progress_step, 1);
        assert!(!config.fill_progress_on_complete);
        assert_eq!(config.measure_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.provider, ProviderKind::Stub);
        assert_eq!(settings.stub.delay_ms, 3000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let raw = r#"
            provider = "http"
            measure_timeout_secs = 0

            [http]
            endpoint = "http://10.0.0.5:3000/speedtest"

            [details]
            isp = "Local Cable"
        "#;
        let settings = Settings::from_toml(raw, "test.toml").unwrap();

        assert_eq!(settings.provider, ProviderKind::Http);
        assert_eq!(settings.http.endpoint, "http://10.0.0.5:3000/speedtest");
        assert_eq!(settings.http.timeout_secs, 10);
        assert_eq!(settings.details.isp, "Local Cable");
        assert_eq!(settings.details.connection, "Fiber");
        assert_eq!(settings.tick_interval_ms, 30);
        assert_eq!(settings.controller_config().measure_timeout, None);
    }

    #[test]
    fn bad_toml_names_its_origin() {
        let err = Settings::from_toml("provider = 7", "broken.toml").unwrap_err();
        assert!(err.to_string().starts_with("parsing broken.toml"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/speedring.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SPEEDRING_PROVIDER", "HTTP"),
            ("SPEEDRING_HTTP_ENDPOINT", "http://backend/speedtest"),
            ("SPEEDRING_TICK_MS", "50"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.provider, ProviderKind::Http);
        assert_eq!(settings.http.endpoint, "http://backend/speedtest");
        assert_eq!(settings.tick_interval_ms, 50);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|k| match k {
            "SPEEDRING_PROVIDER" => Some("carrier-pigeon".to_string()),
            "SPEEDRING_TICK_MS" => Some("fast".to_string()),
            _ => None,
        });
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn adjustments_are_clamped() {
        let mut settings = Settings::default();
        for _ in 0..5 {
            settings.adjust(SettingsField::TickInterval, false);
        }
        assert_eq!(settings.tick_interval_ms, TICK_MIN_MS);
        for _ in 0..30 {
            settings.adjust(SettingsField::TickInterval, true);
        }
        assert_eq!(settings.tick_interval_ms, TICK_MAX_MS);

        settings.adjust(SettingsField::ProgressStep, false);
        assert_eq!(settings.progress_step, 1);
        for _ in 0..20 {
            settings.adjust(SettingsField::ProgressStep, true);
        }
        assert_eq!(settings.progress_step, STEP_MAX);

        settings.adjust(SettingsField::FillOnComplete, false);
        assert!(settings.fill_progress_on_complete);
    }

    #[test]
    fn adjusting_out_of_range_file_values_does_not_overflow() {
        let mut settings = Settings::from_toml(
            "progress_step = 255\ntick_interval_ms = 9223372036854775807",
            "test.toml",
        )
        .unwrap();

        settings.adjust(SettingsField::ProgressStep, true);
        settings.adjust(SettingsField::TickInterval, true);
        assert_eq!(settings.progress_step, STEP_MAX);
        assert_eq!(settings.tick_interval_ms, TICK_MAX_MS);
    }

    #[test]
    fn huge_tick_interval_is_capped() {
        let settings = Settings {
            tick_interval_ms: u64::MAX,
            ..Settings::default()
        };
        assert_eq!(
            settings.controller_config().tick_interval,
            Duration::from_millis(TICK_CEILING_MS)
        );
    }

    #[test]
    fn field_cycle_wraps() {
        let field = SettingsField::FillOnComplete;
        assert_eq!(field.next(), SettingsField::TickInterval);
        assert_eq!(field.next().prev(), field);
    }
}
