//! Top-level state machine for one query-streaming run.
//!
//! Sequences navigation, the optional manual-login wait, query submission
//! and the poll loop that feeds the diff/strip/buffer pipeline, while the
//! completion detector decides when the stream has ended. Exactly one
//! query is in flight at a time: the whole run happens under the session
//! lease, and the session is released on every exit path unless the caller
//! asked to keep it alive.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use relay_cdp_adapter::{
    latest_text, locate, Condition, DriverError, DriverFactory, SessionManager, UiDriver,
};
use relay_core_types::{StreamEvent, StreamStatus};

use crate::chunk::{self, ChunkState};
use crate::completion::{CompletionDetector, CompletionSignal, SILENCE_TIMEOUT};
use crate::error::StreamError;
use crate::selectors;
use crate::thinking;

/// Parameters of one query run.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub query: String,
    pub target_url: String,
    /// Budget for the streaming phase.
    pub timeout: Duration,
    pub keep_session_alive: bool,
}

/// How a run that reached the streaming phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Complete(CompletionSignal),
    Timeout,
}

/// Poll cadences and wait budgets. Production uses the defaults; tests
/// shrink them.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub poll_interval: Duration,
    pub silence_timeout: Duration,
    pub auth_poll_interval: Duration,
    pub auth_timeout: Duration,
    pub auth_probe_timeout: Duration,
    pub identity_retries: usize,
    pub identity_wait: Duration,
    pub input_timeout: Duration,
    pub submit_timeout: Duration,
    pub first_response_timeout: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            silence_timeout: SILENCE_TIMEOUT,
            auth_poll_interval: Duration::from_secs(2),
            auth_timeout: Duration::from_secs(300),
            auth_probe_timeout: Duration::from_secs(1),
            identity_retries: 3,
            identity_wait: Duration::from_secs(8),
            input_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(5),
            first_response_timeout: Duration::from_secs(50),
        }
    }
}

/// Run one query against the shared session and push events to `events`.
///
/// Acquires the session lock (blocking behind any in-flight query),
/// initializes the browser on demand, runs the state machine and releases
/// the session unless `keep_session_alive` was requested. Every fatal
/// fault yields exactly one terminal error event before cleanup.
pub async fn stream_query<F: DriverFactory>(
    manager: &SessionManager<F>,
    config: StreamConfig,
    events: mpsc::Sender<StreamEvent>,
) -> Result<StreamOutcome, StreamError> {
    stream_query_with(manager, config, events, Tuning::default()).await
}

pub async fn stream_query_with<F: DriverFactory>(
    manager: &SessionManager<F>,
    config: StreamConfig,
    events: mpsc::Sender<StreamEvent>,
    tuning: Tuning,
) -> Result<StreamOutcome, StreamError> {
    let emitter = EventEmitter { tx: events };

    let mut lease = manager.lock().await;
    if let Err(source) = lease.ensure().await {
        let failure = StreamError::SessionInit { source };
        emitter.send(StreamEvent::error(failure.to_string())).await;
        return Err(failure);
    }

    let result = match lease.driver() {
        Some(driver) => {
            QueryRun::new(driver, &config, &tuning, &emitter)
                .run()
                .await
        }
        None => Err(StreamError::Fault(
            "session slot empty after initialization".into(),
        )),
    };

    if let Err(err) = &result {
        warn!(%err, "query run failed");
        emitter.send(StreamEvent::error(err.to_string())).await;
    }

    if config.keep_session_alive {
        debug!("retaining browser session across calls");
        emitter.status(StreamStatus::DevModeActive).await;
    } else {
        lease.reset().await;
        emitter.status(StreamStatus::BrowserClosed).await;
    }

    result
}

struct EventEmitter {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventEmitter {
    async fn send(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            // No external cancel signal exists; a dropped consumer does
            // not stop the run, cleanup still has to happen.
            debug!("event consumer dropped");
        }
    }

    async fn status(&self, status: StreamStatus) {
        self.send(StreamEvent::status(status)).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Navigating,
    AwaitingAuth,
    Submitting,
    AwaitingFirstResponse,
    Streaming,
    Finalizing,
}

struct QueryRun<'a> {
    driver: &'a dyn UiDriver,
    config: &'a StreamConfig,
    tuning: &'a Tuning,
    events: &'a EventEmitter,
    baseline_responses: usize,
    detector: CompletionDetector,
    chunks: ChunkState,
    streaming_announced: bool,
    outcome: Option<StreamOutcome>,
}

impl<'a> QueryRun<'a> {
    fn new(
        driver: &'a dyn UiDriver,
        config: &'a StreamConfig,
        tuning: &'a Tuning,
        events: &'a EventEmitter,
    ) -> Self {
        Self {
            driver,
            config,
            tuning,
            events,
            baseline_responses: 0,
            detector: CompletionDetector::new(0),
            chunks: ChunkState::new(Instant::now()),
            streaming_announced: false,
            outcome: None,
        }
    }

    async fn run(mut self) -> Result<StreamOutcome, StreamError> {
        let mut phase = Phase::Navigating;
        loop {
            debug!(?phase, "entering phase");
            phase = match phase {
                Phase::Navigating => self.navigate().await?,
                Phase::AwaitingAuth => self.await_login().await?,
                Phase::Submitting => self.submit().await?,
                Phase::AwaitingFirstResponse => self.await_first_response().await?,
                Phase::Streaming => self.stream().await?,
                Phase::Finalizing => return self.finalize().await,
            };
        }
    }

    async fn navigate(&mut self) -> Result<Phase, StreamError> {
        self.events
            .send(StreamEvent::status_with_message(
                StreamStatus::OpeningBrowser,
                format!("Navigating to {}", self.config.target_url),
            ))
            .await;
        self.driver.navigate(&self.config.target_url).await?;

        let current = self.driver.current_url().await?;
        info!(%current, "navigation landed");
        if selectors::is_signin_address(&current) {
            warn!("redirected to sign-in page");
            self.events
                .send(StreamEvent::status_with_message(
                    StreamStatus::AuthenticationRequired,
                    "Redirected to sign-in. Waiting for manual login...",
                ))
                .await;
            return Ok(Phase::AwaitingAuth);
        }
        Ok(Phase::Submitting)
    }

    async fn await_login(&mut self) -> Result<Phase, StreamError> {
        let deadline = Instant::now() + self.tuning.auth_timeout;
        while Instant::now() < deadline {
            let current = self.driver.current_url().await?;
            if selectors::is_target_domain(&current) {
                let input = locate(
                    self.driver,
                    &selectors::chat_input(),
                    Condition::Present,
                    self.tuning.auth_probe_timeout,
                )
                .await;
                if input.is_some() {
                    info!("manual login detected");
                    self.events
                        .send(StreamEvent::status_with_message(
                            StreamStatus::LoginSuccess,
                            "Login detected. Proceeding...",
                        ))
                        .await;
                    return Ok(Phase::Submitting);
                }
            }
            sleep(self.tuning.auth_poll_interval).await;
        }
        Err(StreamError::AuthTimeout)
    }

    async fn submit(&mut self) -> Result<Phase, StreamError> {
        self.verify_page_identity().await?;
        self.events
            .send(StreamEvent::status_with_message(
                StreamStatus::BrowserReady,
                "Notebook interface loaded.",
            ))
            .await;

        let current = self.driver.current_url().await?;
        if !selectors::is_target_domain(&current) {
            return Err(StreamError::Fault("not on a notebook page".into()));
        }

        // Baselines must predate submission: completion is defined as
        // growth beyond them.
        self.baseline_responses = match self.driver.query(&selectors::response_content()).await {
            Ok(handles) => handles.len(),
            Err(err) => {
                debug!(%err, "baseline response count unavailable, assuming zero");
                0
            }
        };
        let baseline_suggestions = self.count_suggestions().await;
        info!(
            baseline_suggestions,
            baseline_responses = self.baseline_responses,
            "captured pre-submission baselines"
        );
        self.detector = CompletionDetector::new(baseline_suggestions)
            .with_silence_timeout(self.tuning.silence_timeout);

        let Some(input) = locate(
            self.driver,
            &selectors::chat_input(),
            Condition::Clickable,
            self.tuning.input_timeout,
        )
        .await
        else {
            return Err(StreamError::ElementNotFound {
                target: "chat input field",
            });
        };
        self.driver
            .clear_and_type(&input, &self.config.query)
            .await?;

        match locate(
            self.driver,
            &selectors::submit_button(),
            Condition::Clickable,
            self.tuning.submit_timeout,
        )
        .await
        {
            Some(button) => {
                debug!("clicking submit control");
                self.driver.click(&button).await?;
            }
            None => {
                debug!("no submit control found, sending Return");
                self.driver.press_enter(&input).await?;
            }
        }
        info!("query submitted");
        self.events.status(StreamStatus::WaitingForResponse).await;
        Ok(Phase::AwaitingFirstResponse)
    }

    /// Confirm the browser actually sits on the requested notebook.
    ///
    /// The UI sometimes bounces deep links back to the home page; wrong or
    /// notebook-less addresses are re-navigated with a settling wait. The
    /// mismatch is soft: exhausting the retries logs and proceeds, since
    /// some target pages legitimately redirect.
    async fn verify_page_identity(&mut self) -> Result<(), StreamError> {
        let Some(target_id) = selectors::notebook_id(&self.config.target_url) else {
            return Ok(());
        };
        for attempt in 1..=self.tuning.identity_retries {
            let current = self.driver.current_url().await?;
            let on_notebook = current.contains(selectors::NOTEBOOK_PATH_SEGMENT);
            if on_notebook && current.contains(target_id) {
                debug!(%current, "on the requested notebook");
                return Ok(());
            }
            warn!(
                attempt,
                retries = self.tuning.identity_retries,
                %current,
                target = %self.config.target_url,
                "address mismatch, re-navigating"
            );
            self.driver.navigate(&self.config.target_url).await?;
            sleep(self.tuning.identity_wait).await;
        }
        warn!(
            target = %self.config.target_url,
            "address still mismatched after retries, proceeding anyway"
        );
        Ok(())
    }

    async fn await_first_response(&mut self) -> Result<Phase, StreamError> {
        let deadline = Instant::now() + self.tuning.first_response_timeout;
        loop {
            match self.driver.query(&selectors::response_content()).await {
                Ok(handles) if handles.len() > self.baseline_responses => {
                    if let Some(last) = handles.last() {
                        let visible = self.driver.is_visible(last).await.unwrap_or(false);
                        let text = self.driver.text(last).await.unwrap_or_default();
                        if visible && !text.trim().is_empty() {
                            info!("response container detected");
                            return Ok(Phase::Streaming);
                        }
                    }
                }
                Ok(_) => {}
                Err(err) if err.is_transient() => {}
                Err(err) => return Err(err.into()),
            }
            if Instant::now() >= deadline {
                return Err(StreamError::NoResponse);
            }
            sleep(self.tuning.poll_interval).await;
        }
    }

    async fn stream(&mut self) -> Result<Phase, StreamError> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            if Instant::now() >= deadline {
                info!("per-query timeout reached");
                self.outcome = Some(StreamOutcome::Timeout);
                return Ok(Phase::Finalizing);
            }

            match latest_text(self.driver, &selectors::response_content()).await {
                Ok(Some(raw)) => {
                    let clean = thinking::strip(&raw);
                    if let Some(text) = chunk::absorb(&mut self.chunks, &clean, Instant::now()) {
                        self.emit_chunk(text).await;
                    }
                }
                // Nothing reliable to read this tick; not an update.
                Ok(None) => {}
                Err(DriverError::Stale) => return Err(StreamError::StaleReference),
                Err(err) => return Err(err.into()),
            }

            let suggestions = self.count_suggestions().await;
            if let Some(signal) = self.detector.evaluate(
                suggestions,
                self.chunks.material_started(),
                self.chunks.idle_for(Instant::now()),
            ) {
                info!(?signal, "completion detected");
                self.outcome = Some(StreamOutcome::Complete(signal));
                return Ok(Phase::Finalizing);
            }

            sleep(self.tuning.poll_interval).await;
        }
    }

    async fn finalize(&mut self) -> Result<StreamOutcome, StreamError> {
        // One last read catches whatever rendered between the final tick
        // and the stop decision.
        if let Ok(Some(raw)) = latest_text(self.driver, &selectors::response_content()).await {
            let clean = thinking::strip(&raw);
            if let Some(text) = chunk::absorb(&mut self.chunks, &clean, Instant::now()) {
                self.emit_chunk(text).await;
            }
        }
        if let Some(rest) = chunk::finalize(&mut self.chunks) {
            self.emit_chunk(rest).await;
        }
        self.events.status(StreamStatus::EndOfStream).await;

        let outcome = self.outcome.unwrap_or(StreamOutcome::Timeout);
        match outcome {
            StreamOutcome::Complete(_) => self.events.status(StreamStatus::Complete).await,
            StreamOutcome::Timeout => self.events.status(StreamStatus::Timeout).await,
        }
        info!(?outcome, "query finished");
        Ok(outcome)
    }

    async fn emit_chunk(&mut self, text: String) {
        if !self.streaming_announced {
            self.events.status(StreamStatus::Streaming).await;
            self.streaming_announced = true;
        }
        self.events.send(StreamEvent::chunk(text)).await;
    }

    /// Unique suggestion affordances currently present, across all catalog
    /// alternatives. Identity is the element handle, not its label, since
    /// identical labels recur. Probe failures are swallowed: a miscount
    /// here only delays completion by a tick.
    async fn count_suggestions(&self) -> usize {
        let mut unique: HashSet<String> = HashSet::new();
        for locator in selectors::suggestion_chips() {
            match self.driver.query(&locator).await {
                Ok(handles) => unique.extend(handles.into_iter().map(|handle| handle.id)),
                Err(err) => debug!(%locator, %err, "suggestion probe failed"),
            }
        }
        unique.len()
    }
}
