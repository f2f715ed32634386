//! Concurrent consumer of health events.
//!
//! Each delivery moves through parse, acknowledge, cache update, registry
//! update on transition, and sample append. Only a parse failure ends
//! processing early. Store failures are logged, counted, and absorbed so a
//! cache or log outage never stalls consumption; resync repairs the cache.

use crate::server::ports::ServerRegistryRepository;
use crate::status::{
    domain::{HealthEvent, StatusSample},
    ports::{Delivery, HealthEventSource, HealthEventSourceError, StatusCache, StatusLog},
};
use mockable::Clock;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Deliveries dispatched to a worker.
    pub received: u64,
    /// Deliveries dropped because the payload did not parse.
    pub malformed: u64,
    /// Cache writes that failed and were absorbed.
    pub cache_failures: u64,
    /// Sample appends that failed and were absorbed.
    pub log_failures: u64,
    /// Registry status writes that failed and were absorbed.
    pub registry_failures: u64,
}

/// Errors that end an ingestion run.
#[derive(Debug, Error)]
pub enum StatusIngestError {
    /// The event transport failed; in-flight work was drained first.
    #[error("health event source failed: {error}")]
    Source {
        /// Transport failure.
        #[source]
        error: HealthEventSourceError,
        /// Counters for the work completed before the failure.
        report: IngestReport,
    },
}

#[derive(Debug, Default)]
struct IngestCounters {
    received: AtomicU64,
    malformed: AtomicU64,
    cache_failures: AtomicU64,
    log_failures: AtomicU64,
    registry_failures: AtomicU64,
}

impl IngestCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> IngestReport {
        IngestReport {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
            log_failures: self.log_failures.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
        }
    }
}

struct IngestPipeline<R, S, L, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    L: StatusLog + ?Sized,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    cache: Arc<S>,
    log: Arc<L>,
    clock: Arc<C>,
    counters: IngestCounters,
}

impl<R, S, L, C> IngestPipeline<R, S, L, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    L: StatusLog + ?Sized,
    C: Clock + Send + Sync,
{
    async fn process(&self, mut delivery: Delivery) {
        IngestCounters::bump(&self.counters.received);

        let event = match HealthEvent::from_json(delivery.payload()) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "dropping malformed health event");
                IngestCounters::bump(&self.counters.malformed);
                delivery.acknowledge();
                return;
            }
        };
        delivery.acknowledge();

        let internal_id = event.internal_id();
        let online = event.observed_up();
        let previous = match self.cache.set_online(internal_id, online).await {
            Ok(previous) => previous,
            Err(err) => {
                warn!(
                    internal_id = %internal_id,
                    online,
                    error = %err,
                    "status cache update failed; continuing"
                );
                IngestCounters::bump(&self.counters.cache_failures);
                None
            }
        };

        // Transitions are judged against the cache bit, not the registry row.
        // A registry left behind by an absorbed write catches up after the
        // next resync turns the cache bit back to the registry's view.
        if previous != Some(online) {
            self.record_transition(&event).await;
        }

        let sample = StatusSample::observed(&event, &*self.clock);
        if let Err(err) = self.log.append(&sample).await {
            warn!(
                internal_id = %internal_id,
                error = %err,
                "status sample append failed; continuing"
            );
            IngestCounters::bump(&self.counters.log_failures);
        }
    }

    async fn record_transition(&self, event: &HealthEvent) {
        let internal_id = event.internal_id();
        match self
            .registry
            .set_status(internal_id, event.status(), self.clock.utc())
            .await
        {
            Ok(()) => debug!(
                internal_id = %internal_id,
                address = event.address(),
                status = %event.status(),
                "server status changed"
            ),
            Err(err) => {
                warn!(
                    internal_id = %internal_id,
                    error = %err,
                    "registry status update failed; continuing"
                );
                IngestCounters::bump(&self.counters.registry_failures);
            }
        }
    }
}

/// Bounded worker pool draining a [`HealthEventSource`].
///
/// At most `workers` deliveries are processed at once. When every slot is
/// busy the next pull from the source waits, which is the backpressure the
/// transport sees.
pub struct StatusIngestor<R, S, L, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    L: StatusLog + ?Sized,
    C: Clock + Send + Sync,
{
    pipeline: Arc<IngestPipeline<R, S, L, C>>,
    workers: NonZeroU32,
}

impl<R, S, L, C> StatusIngestor<R, S, L, C>
where
    R: ServerRegistryRepository + ?Sized + 'static,
    S: StatusCache + ?Sized + 'static,
    L: StatusLog + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an ingestor with a pool of `workers` concurrent workers.
    #[must_use]
    pub fn new(
        registry: Arc<R>,
        cache: Arc<S>,
        log: Arc<L>,
        clock: Arc<C>,
        workers: NonZeroU32,
    ) -> Self {
        Self {
            pipeline: Arc::new(IngestPipeline {
                registry,
                cache,
                log,
                clock,
                counters: IngestCounters::default(),
            }),
            workers,
        }
    }

    /// Returns the worker pool size.
    #[must_use]
    pub const fn workers(&self) -> NonZeroU32 {
        self.workers
    }

    /// Consumes `source` until it ends or `shutdown` fires, then waits for
    /// in-flight workers to finish.
    ///
    /// In-flight processing is never cancelled. Counters accumulate across
    /// runs of the same ingestor.
    ///
    /// # Errors
    ///
    /// Returns [`StatusIngestError::Source`] when the transport fails. Work
    /// already dispatched is drained before returning.
    pub async fn run<E>(
        &self,
        source: &mut E,
        shutdown: CancellationToken,
    ) -> Result<IngestReport, StatusIngestError>
    where
        E: HealthEventSource + ?Sized,
    {
        let capacity = usize::try_from(self.workers.get()).unwrap_or(usize::MAX);
        let slots = Arc::new(Semaphore::new(capacity));
        info!(workers = self.workers.get(), "health event ingestion started");

        let mut failure = None;
        loop {
            let permit = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                acquired = Arc::clone(&slots).acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                next = source.next_delivery() => next,
            };
            match next {
                Ok(Some(delivery)) => {
                    let pipeline = Arc::clone(&self.pipeline);
                    tokio::spawn(async move {
                        pipeline.process(delivery).await;
                        drop(permit);
                    });
                }
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "health event source failed; draining workers");
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Ok(all_slots) = slots.acquire_many(self.workers.get()).await {
            drop(all_slots);
        }
        let report = self.pipeline.counters.snapshot();
        info!(
            received = report.received,
            malformed = report.malformed,
            cache_failures = report.cache_failures,
            log_failures = report.log_failures,
            registry_failures = report.registry_failures,
            "health event ingestion stopped"
        );

        match failure {
            Some(error) => Err(StatusIngestError::Source { error, report }),
            None => Ok(report),
        }
    }
}
