//! Serialized outbound request queue.
//!
//! Every call to Discord goes through one `RequestQueue`. A single drain task
//! runs the queued operations one at a time in submission order. When an
//! operation reports a rate limit, the whole queue pauses for the reported
//! wait and the same operation is retried before anything that queued behind
//! it. Other failures go straight back to the caller.

use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

use crate::error::{QueueError, RateLimitSignal};
use crate::metrics::{QUEUE_DEPTH, QUEUE_WAIT, RATE_LIMIT_HITS};

#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    // None retries rate-limited calls for as long as the server asks
    pub max_rate_limit_retries: Option<u32>,
}

enum Step {
    Settled,
    RateLimited(Duration),
}

// Type-erased queue entry so one queue can carry calls with different result types
#[async_trait]
trait QueuedCall: Send {
    async fn attempt(&mut self) -> Step;

    fn give_up(self: Box<Self>, attempts: u32);

    fn fail_panicked(self: Box<Self>);
}

struct QueueEntry<F, T, E> {
    operation: F,
    reply: Option<oneshot::Sender<Result<T, QueueError<E>>>>,
    last_limit: Option<E>,
}

impl<F, T, E> QueueEntry<F, T, E> {
    fn settle(&mut self, outcome: Result<T, QueueError<E>>) {
        if let Some(reply) = self.reply.take() {
            // Caller may have stopped waiting, that's fine
            let _ = reply.send(outcome);
        }
    }
}

#[async_trait]
impl<F, Fut, T, E> QueuedCall for QueueEntry<F, T, E>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: RateLimitSignal + Send + 'static,
{
    async fn attempt(&mut self) -> Step {
        match (self.operation)().await {
            Ok(value) => {
                self.settle(Ok(value));
                Step::Settled
            }
            Err(err) => match err.retry_after() {
                Some(wait) => {
                    self.last_limit = Some(err);
                    Step::RateLimited(wait)
                }
                None => {
                    self.settle(Err(QueueError::Operation(err)));
                    Step::Settled
                }
            },
        }
    }

    fn give_up(mut self: Box<Self>, attempts: u32) {
        let outcome = match self.last_limit.take() {
            Some(last) => Err(QueueError::RetriesExhausted { attempts, last }),
            None => Err(QueueError::Closed),
        };
        self.settle(outcome);
    }

    fn fail_panicked(mut self: Box<Self>) {
        self.settle(Err(QueueError::Panicked));
    }
}

struct Job {
    call: Box<dyn QueuedCall>,
    queued_at: Instant,
}

// State the drain task shares with queue handles
#[derive(Default)]
struct QueueShared {
    pending: AtomicUsize,
    draining: AtomicBool,
    cooldown_until: Mutex<Option<Instant>>,
}

impl QueueShared {
    fn cooldown(&self) -> Option<Instant> {
        *self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_cooldown(&self, until: Option<Instant>) {
        *self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner()) = until;
    }
}

/// Handle to the process-wide request queue.
///
/// Cloning is cheap; every clone feeds the same drain task. The task exits
/// once all handles are dropped and the remaining entries have settled.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<QueueShared>,
}

impl RequestQueue {
    /// Start the drain task. Must be called inside a tokio runtime.
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(QueueShared::default());

        tokio::spawn(drain_loop(rx, Arc::clone(&shared), config));

        Self { tx, shared }
    }

    /// Queue `operation` behind everything already submitted.
    ///
    /// The entry is enqueued before this returns, so submission order is the
    /// order of `submit` calls, not the order the returned futures are polled.
    /// The operation may be invoked more than once if it is rate limited.
    pub fn submit<F, Fut, T, E>(&self, operation: F) -> Pending<T, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: RateLimitSignal + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            call: Box::new(QueueEntry {
                operation,
                reply: Some(reply_tx),
                last_limit: None,
            }),
            queued_at: Instant::now(),
        };

        // Count before sending so the drain task never sees a job it can't account for
        let depth = self.shared.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(job).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Pending { rx: None };
        }
        QUEUE_DEPTH.set(depth as f64);

        Pending { rx: Some(reply_rx) }
    }

    /// Entries submitted but not yet settled, including the one executing.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.shared.draining.load(Ordering::SeqCst)
    }

    /// Time left on the queue-wide cooldown, if one is active.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let until = self.shared.cooldown()?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }
}

/// Outcome of a submitted operation. Resolves exactly once.
pub struct Pending<T, E> {
    rx: Option<oneshot::Receiver<Result<T, QueueError<E>>>>,
}

impl<T, E> Future for Pending<T, E> {
    type Output = Result<T, QueueError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().rx {
            Some(rx) => Pin::new(rx)
                .poll(cx)
                .map(|res| res.unwrap_or(Err(QueueError::Closed))),
            None => Poll::Ready(Err(QueueError::Closed)),
        }
    }
}

async fn drain_loop(
    mut rx: mpsc::UnboundedReceiver<Job>,
    shared: Arc<QueueShared>,
    config: QueueConfig,
) {
    tracing::debug!("request queue drain task started");

    while let Some(first) = rx.recv().await {
        shared.draining.store(true, Ordering::SeqCst);

        let mut next = Some(first);
        while let Some(job) = next.take() {
            run_job(job, &shared, &config).await;

            let depth = shared.pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            QUEUE_DEPTH.set(depth as f64);

            next = rx.try_recv().ok();
        }

        shared.draining.store(false, Ordering::SeqCst);
    }

    tracing::debug!("request queue closed, drain task exiting");
}

// Runs one entry to settlement. A rate-limited entry is kept in hand and
// retried here, so it stays ahead of everything queued after it.
async fn run_job(job: Job, shared: &QueueShared, config: &QueueConfig) {
    let Job { mut call, queued_at } = job;
    let mut attempts: u32 = 0;

    loop {
        wait_for_cooldown(shared).await;

        attempts += 1;
        // A panicking operation fails its own entry, the drain task keeps going
        let step = AssertUnwindSafe(call.attempt()).catch_unwind().await;
        match step {
            Err(_) => {
                tracing::error!(attempts, "queued operation panicked, failing request");
                call.fail_panicked();
                break;
            }
            Ok(Step::Settled) => break,
            Ok(Step::RateLimited(wait)) => {
                RATE_LIMIT_HITS.inc();
                shared.set_cooldown(Some(Instant::now() + wait));

                if let Some(max) = config.max_rate_limit_retries {
                    if attempts > max {
                        tracing::warn!(
                            attempts,
                            wait_ms = wait.as_millis() as u64,
                            "rate limit retries exhausted, failing request"
                        );
                        call.give_up(attempts);
                        break;
                    }
                }

                tracing::warn!(
                    attempts,
                    wait_ms = wait.as_millis() as u64,
                    "rate limit hit, pausing queue before retry"
                );
            }
        }
    }

    QUEUE_WAIT.observe(queued_at.elapsed().as_secs_f64());
}

async fn wait_for_cooldown(shared: &QueueShared) {
    if let Some(until) = shared.cooldown() {
        if until > Instant::now() {
            tracing::debug!("queue cooldown active, waiting");
            sleep_until(until).await;
        }
        shared.set_cooldown(None);
    }
}
