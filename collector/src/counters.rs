use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use strum::{
    Display,
    EnumIter,
};

#[derive(Debug, Clone, Copy, Display, EnumIter, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CallOutcome {
    Success,
    Failure,
}

/// Success/failure tally of Sentry API calls made during the current cycle.
#[derive(Debug, Default)]
pub struct ApiCallCounters {
    success: AtomicU64,
    failure: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiCallCounts {
    pub success: u64,
    pub failure: u64,
}

impl ApiCallCounters {
    pub fn record(&self, outcome: CallOutcome) {
        let counter = match outcome {
            CallOutcome::Success => &self.success,
            CallOutcome::Failure => &self.failure,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of `result` and pass it through.
    pub fn track<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        self.record(if result.is_ok() {
            CallOutcome::Success
        } else {
            CallOutcome::Failure
        });
        result
    }

    pub fn snapshot(&self) -> ApiCallCounts {
        ApiCallCounts {
            success: self.success.load(Ordering::Relaxed),
            failure: self.failure.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.success.store(0, Ordering::Relaxed);
        self.failure.store(0, Ordering::Relaxed);
    }
}

impl ApiCallCounts {
    pub fn get(&self, outcome: CallOutcome) -> u64 {
        match outcome {
            CallOutcome::Success => self.success,
            CallOutcome::Failure => self.failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn track_counts_by_outcome() {
        let counters = ApiCallCounters::default();
        let _ = counters.track::<_, ()>(Ok(1));
        let _ = counters.track::<(), _>(Err("boom"));
        let _ = counters.track::<(), _>(Err("boom"));

        let counts = counters.snapshot();
        assert_eq!(counts, ApiCallCounts { success: 1, failure: 2 });
        assert_eq!(counts.get(CallOutcome::Failure), 2);

        counters.reset();
        assert_eq!(counters.snapshot(), ApiCallCounts::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(ApiCallCounters::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let counters = counters.clone();
                tokio::spawn(async move {
                    for _ in 0..1000 {
                        counters.record(CallOutcome::Success);
                    }
                })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap();
        }
        assert_eq!(counters.snapshot().success, 16_000);
    }
}
