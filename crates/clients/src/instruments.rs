//! Instruments for collaborator calls.
//!
//! Instruments are owned by the client that uses them and handed in at
//! construction. The recorder-backed implementations register their handles
//! with the global `metrics` recorder once; the in-memory ones keep plain
//! counts so tests can assert on them without touching process state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{Counter, Histogram};

/// Request instruments for one HTTP collaborator.
pub trait RequestMetrics: Send + Sync {
    /// Records how long a request took.
    fn record_duration(&self, elapsed: Duration);

    /// Counts a request that returned a decoded entity.
    fn record_success(&self);

    /// Counts a request that failed for any reason.
    fn record_failure(&self);
}

/// Instruments for the message publisher.
pub trait PublishMetrics: Send + Sync {
    /// Counts a message accepted by the broker.
    fn record_published(&self);

    /// Counts a message that could not be published.
    fn record_failed(&self);
}

/// [`RequestMetrics`] backed by the `metrics` facade.
///
/// Metric names are scoped by collaborator, e.g. `checkout_cart_request_success_total`.
#[derive(Clone)]
pub struct RecorderRequestMetrics {
    duration: Histogram,
    success: Counter,
    failure: Counter,
}

impl RecorderRequestMetrics {
    /// Registers the instruments for the named collaborator (`"cart"`, `"catalog"`).
    pub fn new(collaborator: &str) -> Self {
        Self {
            duration: metrics::histogram!(format!(
                "checkout_{collaborator}_request_duration_milliseconds"
            )),
            success: metrics::counter!(format!("checkout_{collaborator}_request_success_total")),
            failure: metrics::counter!(format!("checkout_{collaborator}_request_failed_total")),
        }
    }
}

impl RequestMetrics for RecorderRequestMetrics {
    fn record_duration(&self, elapsed: Duration) {
        self.duration.record(elapsed.as_secs_f64() * 1000.0);
    }

    fn record_success(&self) {
        self.success.increment(1);
    }

    fn record_failure(&self) {
        self.failure.increment(1);
    }
}

/// [`PublishMetrics`] backed by the `metrics` facade.
#[derive(Clone)]
pub struct RecorderPublishMetrics {
    published: Counter,
    failed: Counter,
}

impl RecorderPublishMetrics {
    pub fn new() -> Self {
        Self {
            published: metrics::counter!("checkout_amqp_messages_produced_total"),
            failed: metrics::counter!("checkout_amqp_messages_failed_total"),
        }
    }
}

impl Default for RecorderPublishMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishMetrics for RecorderPublishMetrics {
    fn record_published(&self) {
        self.published.increment(1);
    }

    fn record_failed(&self) {
        self.failed.increment(1);
    }
}

#[derive(Debug, Default)]
struct RequestCounts {
    durations: Vec<Duration>,
    success: u64,
    failure: u64,
}

/// In-memory [`RequestMetrics`] for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestMetrics {
    state: Arc<Mutex<RequestCounts>>,
}

impl InMemoryRequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> u64 {
        self.state.lock().unwrap().success
    }

    pub fn failure_count(&self) -> u64 {
        self.state.lock().unwrap().failure
    }

    /// Number of durations recorded.
    pub fn duration_count(&self) -> usize {
        self.state.lock().unwrap().durations.len()
    }
}

impl RequestMetrics for InMemoryRequestMetrics {
    fn record_duration(&self, elapsed: Duration) {
        self.state.lock().unwrap().durations.push(elapsed);
    }

    fn record_success(&self) {
        self.state.lock().unwrap().success += 1;
    }

    fn record_failure(&self) {
        self.state.lock().unwrap().failure += 1;
    }
}

#[derive(Debug, Default)]
struct PublishCounts {
    published: u64,
    failed: u64,
}

/// In-memory [`PublishMetrics`] for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublishMetrics {
    state: Arc<Mutex<PublishCounts>>,
}

impl InMemoryPublishMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_count(&self) -> u64 {
        self.state.lock().unwrap().published
    }

    pub fn failed_count(&self) -> u64 {
        self.state.lock().unwrap().failed
    }
}

impl PublishMetrics for InMemoryPublishMetrics {
    fn record_published(&self) {
        self.state.lock().unwrap().published += 1;
    }

    fn record_failed(&self) {
        self.state.lock().unwrap().failed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_request_metrics() {
        let metrics = InMemoryRequestMetrics::new();
        metrics.record_duration(Duration::from_millis(5));
        metrics.record_success();
        metrics.record_failure();
        metrics.record_failure();

        assert_eq!(metrics.duration_count(), 1);
        assert_eq!(metrics.success_count(), 1);
        assert_eq!(metrics.failure_count(), 2);
    }

    #[test]
    fn test_in_memory_publish_metrics_shared_between_clones() {
        let metrics = InMemoryPublishMetrics::new();
        let handle = metrics.clone();
        handle.record_published();
        handle.record_failed();

        assert_eq!(metrics.published_count(), 1);
        assert_eq!(metrics.failed_count(), 1);
    }

    #[test]
    fn test_recorder_metrics_without_recorder_are_noops() {
        let request = RecorderRequestMetrics::new("cart");
        request.record_duration(Duration::from_millis(1));
        request.record_success();
        request.record_failure();

        let publish = RecorderPublishMetrics::new();
        publish.record_published();
        publish.record_failed();
    }
}
