//! Domain-aware dispatch scheduler.
//!
//! Runs a [`plan`](crate::plan::plan) against a [`BrowserChannel`], one call
//! at a time, sleeping through a [`Clock`] between batches.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use nexus_shared::{DispatchConfig, NexusError, Result};

use crate::channel::BrowserChannel;
use crate::clock::{Clock, TokioClock};
use crate::pacer::Pacer;
use crate::plan::{DispatchBatch, Pause, Step, group_by_host, plan};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of one batch of channel calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub host: String,
    pub urls: Vec<String>,
    pub ok: bool,
}

/// Per-URL result, in the order URLs were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStatus {
    pub url: String,
    pub opened: bool,
    pub error: Option<String>,
}

/// Summary of a dispatch call.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Whether the readiness precheck passed.
    pub ready: bool,
    pub batches: Vec<BatchOutcome>,
    pub statuses: Vec<UrlStatus>,
    /// Total time spent sleeping between batches.
    pub paused: Duration,
    pub elapsed: Duration,
}

impl DispatchReport {
    fn not_started(ready: bool, started: Instant) -> Self {
        Self {
            ready,
            batches: Vec::new(),
            statuses: Vec::new(),
            paused: Duration::ZERO,
            elapsed: started.elapsed(),
        }
    }

    /// True when the target was ready, something was dispatched, and every
    /// batch succeeded.
    pub fn success(&self) -> bool {
        self.ready && !self.batches.is_empty() && self.batches.iter().all(|b| b.ok)
    }

    pub fn opened(&self) -> usize {
        self.statuses.iter().filter(|s| s.opened).count()
    }

    pub fn failed(&self) -> usize {
        self.statuses.len() - self.opened()
    }
}

// ---------------------------------------------------------------------------
// Status side channel
// ---------------------------------------------------------------------------

/// Progress callback for dispatch status.
pub trait StatusReporter: Send + Sync {
    /// A host group is about to be dispatched.
    fn group_started(&self, host: &str, count: usize);
    /// A single channel call finished.
    fn url_opened(&self, url: &str, ok: bool);
    /// The dispatch finished (including early exits).
    fn done(&self, report: &DispatchReport);
}

/// No-op reporter for headless/test usage.
pub struct SilentStatus;

impl StatusReporter for SilentStatus {
    fn group_started(&self, _host: &str, _count: usize) {}
    fn url_opened(&self, _url: &str, _ok: bool) {}
    fn done(&self, _report: &DispatchReport) {}
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Opens URL lists through a browser channel with host-aware pacing.
pub struct Scheduler {
    config: DispatchConfig,
    channel: Arc<dyn BrowserChannel>,
    clock: Arc<dyn Clock>,
    pacer: Mutex<Pacer>,
    /// Held for the duration of every channel call.
    gate: tokio::sync::Mutex<()>,
}

impl Scheduler {
    pub fn new(config: DispatchConfig, channel: Arc<dyn BrowserChannel>) -> Self {
        let pacer = Pacer::new(&config);
        Self {
            config,
            channel,
            clock: Arc::new(TokioClock),
            pacer: Mutex::new(pacer),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the clock used for pauses.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a seeded RNG for reproducible pause lengths.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.pacer = Mutex::new(Pacer::seeded(&self.config, seed));
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run [`dispatch`](Self::dispatch) on a background task.
    ///
    /// Aborting the handle stops the dispatch at its next await point.
    pub fn spawn_dispatch(
        self: Arc<Self>,
        urls: Vec<String>,
        private_mode: bool,
        status: Arc<dyn StatusReporter>,
    ) -> JoinHandle<DispatchReport> {
        tokio::spawn(async move { self.dispatch(&urls, private_mode, status.as_ref()).await })
    }

    /// Open `urls` in submission order, grouped by host and paced.
    ///
    /// Failures are recorded per batch; every group is attempted.
    #[instrument(skip_all, fields(count = urls.len(), private = private_mode, channel = %self.channel.name()))]
    pub async fn dispatch(
        &self,
        urls: &[String],
        private_mode: bool,
        status: &dyn StatusReporter,
    ) -> DispatchReport {
        let started = Instant::now();

        if urls.is_empty() {
            debug!("nothing to dispatch");
            let report = DispatchReport::not_started(false, started);
            status.done(&report);
            return report;
        }

        if !self.ensure_ready().await {
            warn!("browser not ready, giving up");
            let report = DispatchReport::not_started(false, started);
            status.done(&report);
            return report;
        }

        let groups = group_by_host(urls);
        let steps = plan(&groups, &self.config, private_mode);
        info!(groups = groups.len(), steps = steps.len(), "dispatching");

        let mut report = DispatchReport::not_started(true, started);
        for step in steps {
            match step {
                Step::BeginGroup { host, count } => {
                    info!(%host, count, "opening group");
                    status.group_started(&host, count);
                }
                Step::Open(batch) => {
                    let outcome = self.open_batch(&batch, &mut report.statuses, status).await;
                    if !outcome.ok {
                        warn!(host = %outcome.host, urls = outcome.urls.len(), "batch failed");
                    }
                    report.batches.push(outcome);
                }
                Step::Wait(pause) => {
                    report.paused += self.pause(pause).await;
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            opened = report.opened(),
            failed = report.failed(),
            paused_ms = report.paused.as_millis(),
            success = report.success(),
            "dispatch finished"
        );
        status.done(&report);
        report
    }

    /// Check the target, waiting `launch_settle` after a launch request and
    /// `readiness_retry_delay` after an error, up to `readiness_attempts`.
    async fn ensure_ready(&self) -> bool {
        let attempts = self.config.readiness_attempts.max(1);
        for attempt in 1..=attempts {
            let wait = match self
                .call("ensure_target_running", self.channel.ensure_target_running())
                .await
            {
                Ok(true) => {
                    debug!(attempt, "target ready");
                    return true;
                }
                Ok(false) => {
                    info!(attempt, "target launching");
                    self.config.launch_settle
                }
                Err(e) => {
                    warn!(attempt, error = %e, "readiness check failed");
                    self.config.readiness_retry_delay
                }
            };
            if attempt < attempts {
                self.clock.sleep(wait).await;
            }
        }
        false
    }

    async fn open_batch(
        &self,
        batch: &DispatchBatch,
        statuses: &mut Vec<UrlStatus>,
        status: &dyn StatusReporter,
    ) -> BatchOutcome {
        let mut ok = true;
        for (i, url) in batch.urls.iter().enumerate() {
            let result = if i == 0 && batch.is_first_of_session {
                self.call(
                    "open_in_new_window",
                    self.channel.open_in_new_window(url, batch.private_mode),
                )
                .await
            } else {
                self.call("open_as_tab", self.channel.open_as_tab(url)).await
            };

            let error = result.err().map(|e| {
                warn!(%url, error = %e, "failed to open url");
                e.to_string()
            });
            let opened = error.is_none();
            ok &= opened;
            status.url_opened(url, opened);
            statuses.push(UrlStatus {
                url: url.clone(),
                opened,
                error,
            });
        }
        BatchOutcome {
            host: batch.host.clone(),
            urls: batch.urls.clone(),
            ok,
        }
    }

    async fn pause(&self, pause: Pause) -> Duration {
        let delay = match self.pacer.lock() {
            Ok(mut pacer) => pacer.delay(pause),
            Err(poisoned) => poisoned.into_inner().delay(pause),
        };
        debug!(?pause, delay_ms = delay.as_millis(), "pausing");
        self.clock.sleep(delay).await;
        delay
    }

    /// Serialize and time-bound one channel call.
    async fn call<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let _guard = self.gate.lock().await;
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(NexusError::Channel(format!(
                "{op} timed out after {}ms",
                self.config.call_timeout.as_millis()
            ))),
        }
    }
}
