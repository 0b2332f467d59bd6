//! Sequences a single speed-test run from trigger to result.
//!
//! The controller is the only owner of the [`Session`]. Background work (the
//! progress ticker and the provider call) runs in spawned tasks that never
//! touch the session directly: they send [`RunEvent`]s tagged with the run
//! generation, and the controller applies them from `&mut self`. Events from
//! an older generation, or arriving after teardown, are dropped.

use super::{Session, Status, PROGRESS_MAX};
use crate::provider::{Measurement, MeasurementProvider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub tick_interval: Duration,
    pub progress_step: u8,
    /// Snap the ring to 100 when results arrive before the ticker finished.
    pub fill_progress_on_complete: bool,
    pub measure_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(30),
            progress_step: 1,
            fill_progress_on_complete: false,
            measure_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug)]
enum RunEvent {
    Tick {
        run: u64,
        step: u8,
    },
    Resolved {
        run: u64,
        outcome: Result<Measurement, ProviderError>,
    },
}

impl RunEvent {
    fn run(&self) -> u64 {
        match self {
            RunEvent::Tick { run, .. } | RunEvent::Resolved { run, .. } => *run,
        }
    }
}

pub struct Controller {
    session: Session,
    provider: Arc<dyn MeasurementProvider>,
    config: ControllerConfig,
    run: u64,
    events_tx: mpsc::Sender<RunEvent>,
    events_rx: mpsc::Receiver<RunEvent>,
    ticker: Option<JoinHandle<()>>,
    measurement: Option<JoinHandle<()>>,
    provider_call: Option<AbortHandle>,
    torn_down: bool,
}

impl Controller {
    pub fn new(provider: Arc<dyn MeasurementProvider>, config: ControllerConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            session: Session::new(),
            provider,
            config,
            run: 0,
            events_tx,
            events_rx,
            ticker: None,
            measurement: None,
            provider_call: None,
            torn_down: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Takes effect at the next `start()`.
    pub fn configure(&mut self, config: ControllerConfig) {
        self.config = config;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Begins a new run. Returns false when a run is already in progress or
    /// the controller has been torn down.
    pub fn start(&mut self) -> bool {
        if self.torn_down {
            tracing::debug!("start ignored, controller torn down");
            return false;
        }
        if self.session.is_running() {
            tracing::debug!(run = self.run, "start ignored, run in progress");
            return false;
        }

        self.stop_tasks();
        self.run += 1;
        self.session.begin_run();
        self.ticker = Some(self.spawn_ticker());
        self.spawn_measurement();

        tracing::info!(run = self.run, provider = self.provider.name(), "speed test started");
        true
    }

    /// Applies every queued event without waiting. Returns how many of them
    /// changed the session.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next event of the active run and applies it. Returns
    /// `None` right away when nothing is running.
    pub async fn next_event(&mut self) -> Option<Status> {
        if self.torn_down || !self.session.is_running() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.apply(event);
        Some(self.session.status())
    }

    /// Cancels the ticker and any pending provider call. Nothing mutates the
    /// session afterwards.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.stop_tasks();
        self.events_rx.close();
        tracing::debug!(run = self.run, "controller torn down");
    }

    fn apply(&mut self, event: RunEvent) -> bool {
        if self.torn_down {
            return false;
        }
        if event.run() != self.run {
            tracing::debug!(stale = event.run(), current = self.run, "dropping stale run event");
            return false;
        }
        if !self.session.is_running() {
            return false;
        }

        match event {
            RunEvent::Tick { step, .. } => {
                let before = self.session.progress();
                if self.session.advance_progress(step) {
                    if let Some(ticker) = self.ticker.take() {
                        ticker.abort();
                    }
                }
                self.session.progress() != before
            }
            RunEvent::Resolved { outcome, .. } => {
                if let Some(ticker) = self.ticker.take() {
                    ticker.abort();
                }
                self.measurement = None;
                self.provider_call = None;

                match outcome {
                    Ok(result) => {
                        self.session
                            .complete(result, self.config.fill_progress_on_complete);
                        tracing::info!(
                            run = self.run,
                            download_mbps = result.download_mbps,
                            upload_mbps = result.upload_mbps,
                            ping_ms = result.ping_ms,
                            progress = self.session.progress(),
                            "speed test complete"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(run = self.run, error = %e, "speed test failed");
                        self.session.fail(e.to_string());
                    }
                }
                true
            }
        }
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        let run = self.run;
        let period = self.config.tick_interval.max(Duration::from_millis(1));
        let step = self.config.progress_step.max(1);
        let ticks = (PROGRESS_MAX as usize).div_ceil(step as usize);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for _ in 0..ticks {
                interval.tick().await;
                if tx.send(RunEvent::Tick { run, step }).await.is_err() {
                    break;
                }
            }
        })
    }

    /// The provider runs in its own task so a panic surfaces as a
    /// `JoinError` instead of silently killing the run.
    fn spawn_measurement(&mut self) {
        let tx = self.events_tx.clone();
        let run = self.run;
        let provider = Arc::clone(&self.provider);
        let limit = self.config.measure_timeout;

        let mut call = tokio::spawn(async move { provider.measure().await });
        self.provider_call = Some(call.abort_handle());

        self.measurement = Some(tokio::spawn(async move {
            let joined = match limit {
                Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        call.abort();
                        Ok(Err(ProviderError::TimedOut(limit)))
                    }
                },
                None => call.await,
            };
            let outcome = joined.unwrap_or_else(|e| Err(crashed(e)));
            let _ = tx.send(RunEvent::Resolved { run, outcome }).await;
        }));
    }

    fn stop_tasks(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(measurement) = self.measurement.take() {
            measurement.abort();
        }
        if let Some(call) = self.provider_call.take() {
            call.abort();
        }
    }
}

fn crashed(err: JoinError) -> ProviderError {
    if !err.is_panic() {
        return ProviderError::Crashed(err.to_string());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "provider panicked".to_string());
    ProviderError::Crashed(message)
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
