//! Run orchestration
//!
//! The coordinator drives one run through discovery, the bounded worker pool
//! and finalization:
//!
//! ```text
//! Idle -> Discovering -> Fetching -> Aggregating -> Done
//!              |
//!              +-> Failed (account not found, listing root unreachable)
//! ```
//!
//! Workers fetch and extract in parallel and send their outcome over a channel.
//! A single consumer owns the merge into the [`Aggregator`], batching facts so
//! the lock is taken once per batch.
//!
//! A run future that is dropped part way leaves the coordinator usable: its
//! workers are aborted and the next run starts from a clean state.

use crate::config::{validate, validate_concurrency, validate_user, Config};
use crate::crawler::{discover, FetchClient, FetchError};
use crate::extract::{ExtractionPolicy, ItemFacts};
use crate::state::{Progress, RunState};
use crate::stats::{Aggregator, RunSummary};
use crate::CensusError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What to crawl, and how wide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Account whose listing is crawled
    pub user: String,

    /// Worker limit; `None` uses `crawler.max-concurrent-fetches`
    pub concurrency: Option<usize>,
}

impl RunRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            concurrency: None,
        }
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }
}

/// Result of one film task
#[derive(Debug)]
enum ItemOutcome {
    Extracted(ItemFacts),
    Failed(FetchError),
}

/// State that lives for exactly one run
struct RunContext {
    user: String,
    aggregator: Aggregator,
    cancel: CancellationToken,
    progress: Progress,
}

/// Shared, read-only inputs of every worker
#[derive(Clone)]
struct WorkerContext {
    client: FetchClient,
    policy: Arc<ExtractionPolicy>,
    urls: Arc<Vec<String>>,
    next: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

/// Worker tasks of one run, aborted if the run stops waiting for them
struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn(count: usize, shared: &WorkerContext, tx: &mpsc::Sender<ItemOutcome>) -> Self {
        let handles = (0..count)
            .map(|_| tokio::spawn(worker(shared.clone(), tx.clone())))
            .collect();
        Self { handles }
    }

    async fn join(&mut self) {
        for result in futures::future::join_all(self.handles.iter_mut()).await {
            if let Err(e) = result {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Main run coordinator
///
/// Owns the pooled HTTP client and the extraction policy, both reused across
/// runs. Everything else, the cancellation token included, is rebuilt for
/// each call to [`Coordinator::run`].
pub struct Coordinator {
    config: Arc<Config>,
    client: FetchClient,
    policy: Arc<ExtractionPolicy>,
    state: RunState,
    cancel: CancellationToken,
    progress: watch::Sender<Progress>,
}

impl Coordinator {
    /// Creates a coordinator from a validated configuration
    ///
    /// # Errors
    ///
    /// * `Config` - the configuration is invalid
    /// * `HttpClient` - the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, CensusError> {
        validate(&config)?;

        let client = FetchClient::new(&config.http, &config.user_agent)?;
        let (progress, _) = watch::channel(Progress::default());

        Ok(Self {
            config: Arc::new(config),
            client,
            policy: Arc::new(ExtractionPolicy::new()),
            state: RunState::Idle,
            cancel: CancellationToken::new(),
            progress,
        })
    }

    /// Token for the next run
    ///
    /// Each run takes the token handed out before it starts, so cancelling it
    /// stops that run only. Call again after a run to cancel the following one.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribes to progress updates
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Stage of the most recent run
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one census and returns its summary
    ///
    /// Per-film failures are counted in [`RunSummary::failed`] and never fail
    /// the run. A cancelled run still returns the summary of every film merged
    /// before the cancellation, with `cancelled` set.
    ///
    /// # Errors
    ///
    /// * `Config` - invalid account name or concurrency, before any request
    /// * `TargetNotFound` - the account does not exist
    /// * `Discovery` - the first listing page could not be fetched
    pub async fn run(&mut self, request: RunRequest) -> Result<RunSummary, CensusError> {
        let limit = request
            .concurrency
            .unwrap_or(self.config.crawler.max_concurrent_fetches);
        validate_user(&request.user)?;
        validate_concurrency(limit)?;

        if self.state.is_active() {
            tracing::warn!(
                "Previous run was abandoned while {}; starting over",
                self.state
            );
            self.state = RunState::Failed;
        }
        if self.state.is_terminal() {
            self.state.transition(RunState::Idle)?;
        }

        let started = Instant::now();
        let mut ctx = RunContext {
            user: request.user,
            aggregator: Aggregator::new(),
            cancel: std::mem::replace(&mut self.cancel, CancellationToken::new()),
            progress: Progress::default(),
        };

        self.enter(&mut ctx, RunState::Discovering)?;
        tracing::info!("Collecting films of '{}'", ctx.user);

        let discovery = match discover(
            &self.client,
            &self.config.site,
            &ctx.user,
            self.config.crawler.max_listing_pages,
            &ctx.cancel,
        )
        .await
        {
            Ok(discovery) => discovery,
            Err(e) => {
                tracing::error!("Discovery failed for '{}': {}", ctx.user, e);
                self.enter(&mut ctx, RunState::Failed)?;
                return Err(e);
            }
        };

        if discovery.hit_ceiling {
            tracing::warn!(
                "Stopped at the {}-page listing ceiling; later films are not counted",
                self.config.crawler.max_listing_pages
            );
        }

        ctx.progress.discovered = discovery.urls.len() as u64;
        self.enter(&mut ctx, RunState::Fetching)?;

        let discovered = discovery.urls.len() as u64;
        let mut cancelled = discovery.cancelled;
        if !cancelled {
            cancelled = self.fetch_all(&mut ctx, discovery.urls, limit).await;
        }

        self.enter(&mut ctx, RunState::Aggregating)?;
        let tally = std::mem::take(&mut ctx.aggregator).into_tally();
        let summary = RunSummary::finalize(&ctx.user, tally, discovered, cancelled);
        self.enter(&mut ctx, RunState::Done)?;

        tracing::info!(
            "Run for '{}' finished in {:.1?}: {} films, {} failed{}",
            summary.user,
            started.elapsed(),
            summary.items,
            summary.failed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        Ok(summary)
    }

    /// Fetches every film with at most `limit` workers
    ///
    /// Returns true if the run was cancelled before every film completed.
    async fn fetch_all(&self, ctx: &mut RunContext, urls: Vec<String>, limit: usize) -> bool {
        let total = urls.len();
        let workers = limit.min(total);
        if workers == 0 {
            return false;
        }

        tracing::info!("Fetching {} films with {} workers", total, workers);

        let shared = WorkerContext {
            client: self.client.clone(),
            policy: Arc::clone(&self.policy),
            urls: Arc::new(urls),
            next: Arc::new(AtomicUsize::new(0)),
            cancel: ctx.cancel.clone(),
        };

        let (tx, mut rx) = mpsc::channel::<ItemOutcome>(workers * 2);
        let mut pool = WorkerPool::spawn(workers, &shared, &tx);
        drop(tx);

        let batch_size = self.config.crawler.merge_batch_size.max(1);
        let log_interval = self.config.crawler.progress_log_interval.max(1);
        let mut batch: Vec<ItemFacts> = Vec::with_capacity(batch_size);

        while let Some(outcome) = rx.recv().await {
            match outcome {
                ItemOutcome::Extracted(facts) => {
                    batch.push(facts);
                    if batch.len() >= batch_size {
                        ctx.aggregator.merge_batch(&batch);
                        batch.clear();
                    }
                }
                ItemOutcome::Failed(e) => {
                    tracing::warn!("Skipping film: {}", e);
                    ctx.aggregator.record_failure();
                    ctx.progress.failed += 1;
                }
            }

            ctx.progress.completed += 1;
            self.progress.send_replace(ctx.progress);

            if ctx.progress.completed % log_interval == 0 {
                tracing::info!(
                    "Progress: {}/{} films ({:.0}%, {} failed)",
                    ctx.progress.completed,
                    total,
                    ctx.progress.fraction() * 100.0,
                    ctx.progress.failed
                );
            }
        }
        ctx.aggregator.merge_batch(&batch);

        pool.join().await;

        let cancelled = ctx.cancel.is_cancelled() && ctx.progress.remaining() > 0;
        if cancelled {
            tracing::warn!(
                "Run cancelled with {} of {} films unfinished; summary is partial",
                ctx.progress.remaining(),
                total
            );
        }
        cancelled
    }

    fn enter(&mut self, ctx: &mut RunContext, next: RunState) -> Result<(), CensusError> {
        self.state.transition(next)?;
        ctx.progress.state = next;
        self.progress.send_replace(ctx.progress);
        tracing::debug!("Run for '{}' is now {}", ctx.user, next);
        Ok(())
    }
}

/// Pulls film URLs off the shared index until none remain or the run is cancelled
async fn worker(ctx: WorkerContext, tx: mpsc::Sender<ItemOutcome>) {
    loop {
        let index = ctx.next.fetch_add(1, Ordering::Relaxed);
        let Some(url) = ctx.urls.get(index) else {
            break;
        };

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            result = ctx.client.fetch(url) => match result {
                Ok(body) => {
                    let facts = ctx.policy.extract(&body);
                    log_gaps(url, &facts);
                    ItemOutcome::Extracted(facts)
                }
                Err(e) => ItemOutcome::Failed(e),
            },
        };

        if tx.send(outcome).await.is_err() {
            break;
        }
    }
}

fn log_gaps(url: &str, facts: &ItemFacts) {
    if facts.is_empty() {
        tracing::debug!("No fields found on {}", url);
        return;
    }
    if facts.decade.is_none() {
        tracing::trace!("No release year on {}", url);
    }
    if facts.runtime_minutes == 0 {
        tracing::trace!("No runtime on {}", url);
    }
}
