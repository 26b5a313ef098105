//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Store de métricas compartido entre los lectores de conexiones, los
//! workers y quien lea las métricas. Los contadores son atómicos; cada
//! muestra se toma junto con el incremento que la produce.

use serde::Serialize;

use super::calculator;
use super::counters::{CounterKind, CounterSet};
use super::sample::{MonotonicClock, Sample, SampleHistory};

/// Collector de métricas thread-safe
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: CounterSet,

    /// Muestras (bytes POST acumulados, cantidad de POSTs)
    post_size: SampleHistory,

    /// Muestras (requests encolados, timestamp)
    request_rate: SampleHistory,

    clock: MonotonicClock,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pone todos los contadores en cero. Los historiales no se tocan.
    pub fn reset_counters(&self) {
        self.counters.reset_all();
    }

    // === Escritura: lectores de conexiones ===

    pub fn record_get(&self) {
        self.counters.get(CounterKind::GetRequests).increment();
    }

    /// Registra un POST y agrega una muestra de tamaño de payload
    ///
    /// Sin `Content-Length` no se suman bytes, pero el POST sí cuenta para
    /// el denominador.
    pub fn record_post(&self, content_length: Option<u64>) {
        self.counters.get(CounterKind::PostRequests).increment();

        self.post_size.push_with(|| {
            let bytes = match content_length {
                Some(len) => self.counters.get(CounterKind::PostBytes).increment_by(len),
                None => self.counters.value(CounterKind::PostBytes),
            };
            let base = self.counters.get(CounterKind::PostBase).increment();
            Sample::new(bytes, base, self.clock.now_nanos())
        });
    }

    /// Registra un request encolado y agrega una muestra de rate
    pub fn record_enqueued(&self) {
        self.request_rate.push_with(|| {
            let value = self.counters.get(CounterKind::Requests).increment();
            Sample::new(value, 0, self.clock.now_nanos())
        });
    }

    // === Escritura: router ===

    pub fn record_success(&self) {
        self.counters.get(CounterKind::Success).increment();
    }

    pub fn record_failure(&self) {
        self.counters.get(CounterKind::Failure).increment();
    }

    // === Lectura ===

    pub fn counter(&self, kind: CounterKind) -> u64 {
        self.counters.value(kind)
    }

    pub fn success_count(&self) -> u64 {
        self.counter(CounterKind::Success)
    }

    pub fn failure_count(&self) -> u64 {
        self.counter(CounterKind::Failure)
    }

    pub fn get_count(&self) -> u64 {
        self.counter(CounterKind::GetRequests)
    }

    pub fn post_count(&self) -> u64 {
        self.counter(CounterKind::PostRequests)
    }

    /// Tamaño promedio de payload de toda la vida; `None` si no hubo POSTs
    pub fn lifetime_average_post_size(&self) -> Option<f64> {
        calculator::lifetime_average(
            self.counter(CounterKind::PostBytes),
            self.counter(CounterKind::PostBase),
        )
    }

    /// Igual que `lifetime_average_post_size` pero 0 cuando no hubo POSTs
    pub fn full_average_post_size(&self) -> f64 {
        self.lifetime_average_post_size().unwrap_or(0.0)
    }

    /// Tamaño promedio de payload desde la muestra anterior
    pub fn average_post_size(&self) -> f64 {
        let lifetime = self.lifetime_average_post_size();
        self.post_size
            .read(|samples| calculator::current_average(samples, lifetime))
    }

    /// Tamaño promedio entre dos muestras del historial (índices recortados)
    pub fn interval_average_post_size(&self, from: i64, to: i64) -> f64 {
        let lifetime = self.lifetime_average_post_size();
        self.post_size
            .read(|samples| calculator::interval_average(samples, from, to, lifetime))
    }

    /// Requests por segundo entre las dos últimas muestras
    pub fn requests_per_second(&self) -> f64 {
        self.request_rate.read(calculator::current_rate)
    }

    pub fn post_size_samples(&self) -> Vec<Sample> {
        self.post_size.to_vec()
    }

    pub fn request_rate_samples(&self) -> Vec<Sample> {
        self.request_rate.to_vec()
    }

    /// Snapshot de todas las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            success: self.success_count(),
            failure: self.failure_count(),
            get_requests: self.get_count(),
            post_requests: self.post_count(),
            post_bytes: self.counter(CounterKind::PostBytes),
            requests: self.counter(CounterKind::Requests),
            average_post_size: self.average_post_size(),
            full_average_post_size: self.full_average_post_size(),
            requests_per_second: self.requests_per_second(),
            post_size_samples: self.post_size.len(),
            request_rate_samples: self.request_rate.len(),
        }
    }
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub success: u64,
    pub failure: u64,
    pub get_requests: u64,
    pub post_requests: u64,
    pub post_bytes: u64,
    pub requests: u64,
    pub average_post_size: f64,
    pub full_average_post_size: f64,
    pub requests_per_second: f64,
    pub post_size_samples: usize,
    pub request_rate_samples: usize,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_parallel_posts_keep_samples_ordered() {
        let metrics = Arc::new(MetricsCollector::new());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_post(Some(2));
                        metrics.record_enqueued();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let posts = metrics.post_size_samples();
        assert_eq!(posts.len(), 1000);
        for (i, sample) in posts.iter().enumerate() {
            assert_eq!(sample.base, i as u64 + 1);
            assert_eq!(sample.value, 2 * (i as u64 + 1));
        }

        let rates = metrics.request_rate_samples();
        assert!(rates.windows(2).all(|w| w[1].value == w[0].value + 1));
        assert!(rates.windows(2).all(|w| w[1].timestamp_nanos >= w[0].timestamp_nanos));
    }

    #[test]
    fn test_empty_collector() {
        let metrics = MetricsCollector::new();
        assert_eq!(metrics.average_post_size(), 0.0);
        assert_eq!(metrics.full_average_post_size(), 0.0);
        assert_eq!(metrics.lifetime_average_post_size(), None);
        assert_eq!(metrics.interval_average_post_size(0, 10), 0.0);
        assert_eq!(metrics.requests_per_second(), 0.0);
    }

    #[test]
    fn test_post_sizes_lifetime_average() {
        let metrics = MetricsCollector::new();
        for size in [10, 20, 30] {
            metrics.record_post(Some(size));
        }
        assert_eq!(metrics.full_average_post_size(), 20.0);

        metrics.record_post(Some(100));
        assert_eq!(metrics.full_average_post_size(), 40.0);
        assert_eq!(metrics.average_post_size(), 100.0);
        assert_eq!(metrics.post_count(), 4);
    }

    #[test]
    fn test_single_post_falls_back_to_lifetime() {
        let metrics = MetricsCollector::new();
        metrics.record_post(Some(42));
        assert_eq!(metrics.average_post_size(), 42.0);
    }

    #[test]
    fn test_post_without_content_length() {
        let metrics = MetricsCollector::new();
        metrics.record_post(Some(30));
        metrics.record_post(None);

        assert_eq!(metrics.post_count(), 2);
        assert_eq!(metrics.counter(CounterKind::PostBase), 2);
        assert_eq!(metrics.counter(CounterKind::PostBytes), 30);
        assert_eq!(metrics.full_average_post_size(), 15.0);
        // La última muestra repite los bytes y suma el denominador
        assert_eq!(metrics.average_post_size(), 0.0);
        assert_eq!(metrics.post_size_samples().len(), 2);
    }

    #[test]
    fn test_interval_average() {
        let metrics = MetricsCollector::new();
        for size in [10, 20, 30, 100] {
            metrics.record_post(Some(size));
        }
        assert_eq!(metrics.interval_average_post_size(0, 3), 50.0);
        assert_eq!(metrics.interval_average_post_size(-3, 100), 50.0);
        assert_eq!(metrics.interval_average_post_size(1, 2), 30.0);
    }

    #[test]
    fn test_requests_per_second() {
        let metrics = MetricsCollector::new();
        metrics.record_enqueued();
        assert_eq!(metrics.requests_per_second(), 0.0);

        thread::sleep(Duration::from_millis(20));
        metrics.record_enqueued();

        let samples = metrics.request_rate_samples();
        let expected = 1.0
            / ((samples[1].timestamp_nanos - samples[0].timestamp_nanos) as f64 / 1e9);
        assert_eq!(metrics.requests_per_second(), expected);
        assert!(metrics.requests_per_second() > 0.0);
    }

    #[test]
    fn test_reset_keeps_histories() {
        let metrics = MetricsCollector::new();
        metrics.record_get();
        metrics.record_success();
        metrics.record_post(Some(5));
        metrics.reset_counters();

        assert_eq!(metrics.get_count(), 0);
        assert_eq!(metrics.success_count(), 0);
        assert_eq!(metrics.post_size_samples().len(), 1);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = MetricsCollector::new();
        metrics.record_get();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get_requests, 1);
        assert_eq!(snapshot.failure, 1);

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json()).unwrap();
        assert_eq!(json["get_requests"], 1);
        assert_eq!(json["failure"], 1);
    }
}
