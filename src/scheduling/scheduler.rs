use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::NaiveDateTime;
use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

use super::{
    SubscriberKey,
    dispatcher::NotificationDispatcher,
    job::{DailyFireTime, JobId, JobKind, ScheduledJob, first_fire, next_fire_after},
    job_store::JobStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    pub replaced: bool,
    pub kind: JobKind,
    pub first_fire_at: NaiveDateTime,
}

pub struct CountdownScheduler<K: SubscriberKey> {
    store: Arc<JobStore<K>>,
    dispatcher: Arc<NotificationDispatcher<K>>,
    clock: Arc<dyn Clock>,
    fire_time: DailyFireTime,
    next_job_id: AtomicU64,
}

impl<K: SubscriberKey> CountdownScheduler<K> {
    pub fn new(
        fire_time: DailyFireTime,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<NotificationDispatcher<K>>,
    ) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            dispatcher,
            clock,
            fire_time,
            next_job_id: AtomicU64::new(1),
        }
    }

    pub fn fire_time(&self) -> &DailyFireTime {
        &self.fire_time
    }

    pub async fn start(&self, subscriber: K) -> StartOutcome {
        let now = self.clock.now();
        self.start_at(subscriber, now).await
    }

    pub async fn start_at(&self, subscriber: K, now: NaiveDateTime) -> StartOutcome {
        let (kind, first_fire_at) = first_fire(&self.fire_time, now);
        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let job = ScheduledJob::new(id, subscriber.clone(), kind, first_fire_at, self.fire_time);
        let run = JobRun::new(&job, &self.store, &self.dispatcher, &self.clock);

        let previous = self.store.put(subscriber.clone(), job).await;
        if let Some(previous) = &previous {
            previous.cancel();
            log::info!(
                "Replaced existing job. [job = {}, job_id = {}]",
                previous.name(),
                previous.id
            );
        }

        log::info!(
            "Scheduled countdown job. [subscriber = {}, job_id = {}, kind = {:?}, first_fire_at = {}]",
            subscriber,
            id,
            kind,
            first_fire_at
        );

        task::spawn(run_job(run));

        StartOutcome {
            replaced: previous.is_some(),
            kind,
            first_fire_at,
        }
    }

    pub async fn stop(&self, subscriber: &K) -> bool {
        match self.store.remove_if_exists(subscriber).await {
            Some(job) => {
                job.cancel();
                log::info!("Job removed. [job = {}, job_id = {}]", job.name(), job.id);
                true
            }
            None => false,
        }
    }

    pub async fn job(&self, subscriber: &K) -> Option<ScheduledJob<K>> {
        self.store.get(subscriber).await
    }

    #[cfg(test)]
    pub async fn active_jobs(&self) -> usize {
        self.store.len().await
    }

    pub async fn shutdown(&self) {
        let jobs = self.store.drain().await;
        for job in &jobs {
            job.cancel();
        }
        log::info!("Scheduler shut down. [cancelled_jobs = {}]", jobs.len());
    }
}

const MAX_SLEEP: Duration = Duration::from_secs(60 * 60);
const MIN_SLEEP: Duration = Duration::from_millis(10);

struct JobRun<K: SubscriberKey> {
    id: JobId,
    subscriber: K,
    kind: JobKind,
    next_fire_at: NaiveDateTime,
    fire_time: DailyFireTime,
    token: CancellationToken,
    store: Arc<JobStore<K>>,
    dispatcher: Arc<NotificationDispatcher<K>>,
    clock: Arc<dyn Clock>,
}

impl<K: SubscriberKey> JobRun<K> {
    fn new(
        job: &ScheduledJob<K>,
        store: &Arc<JobStore<K>>,
        dispatcher: &Arc<NotificationDispatcher<K>>,
        clock: &Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: job.id,
            subscriber: job.subscriber.clone(),
            kind: job.kind,
            next_fire_at: job.next_fire_at,
            fire_time: job.fire_time,
            token: job.cancellation_token(),
            store: Arc::clone(store),
            dispatcher: Arc::clone(dispatcher),
            clock: Arc::clone(clock),
        }
    }

    // Sleeps in bounded steps until the wall clock reaches `next_fire_at`, so DST
    // shifts and clock corrections never make the job fire off its slot.
    // Returns `false` if the job got cancelled meanwhile.
    async fn wait_for_slot(&self) -> bool {
        while self.clock.now() < self.next_fire_at {
            let delay = self
                .clock
                .duration_until(self.next_fire_at)
                .clamp(MIN_SLEEP, MAX_SLEEP);

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        !self.token.is_cancelled()
    }
}

async fn run_job<K: SubscriberKey>(mut run: JobRun<K>) {
    loop {
        if !run.wait_for_slot().await {
            log::info!("Job cancelled. [subscriber = {}, job_id = {}]", run.subscriber, run.id);
            return;
        }

        run.dispatcher.deliver(&run.subscriber).await;

        if run.kind == JobKind::OneShot {
            log::info!(
                "One-shot job fired, switching to daily. [subscriber = {}, job_id = {}]",
                run.subscriber,
                run.id
            );
            run.kind = JobKind::DailyRecurring;
        }
        run.next_fire_at = next_fire_after(&run.fire_time, run.next_fire_at, run.clock.now());

        if !run
            .store
            .advance(&run.subscriber, run.id, run.kind, run.next_fire_at)
            .await
        {
            log::info!(
                "Job no longer registered, stopping. [subscriber = {}, job_id = {}]",
                run.subscriber,
                run.id
            );
            return;
        }

        log::info!(
            "Next countdown scheduled. [subscriber = {}, job_id = {}, next_fire_at = {}]",
            run.subscriber,
            run.id,
            run.next_fire_at
        );
    }
}
