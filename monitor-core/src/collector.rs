//! Metric collector implementation
//!
//! Counters live in a prometheus registry so that increments are atomic and
//! the exporter can encode them directly. Durations go into bounded rolling
//! samples used for averages and percentiles.

use crate::config::MonitoringConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// Sample name fed by request-tracking middleware
pub const API_REQUEST_SAMPLE: &str = "api_request";

/// Buckets of the API request duration histogram, in seconds
const API_DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Percentiles are reported only once a sample holds this many values
const MIN_SAMPLES_FOR_PERCENTILES: usize = 20;

/// Counters known to the collector: name, help text, label names
const COUNTER_DEFINITIONS: &[(&str, &str, &[&str])] = &[
    (
        "library_book_loans_total",
        "Total number of book loans",
        &["book_category", "user_role", "loan_status"],
    ),
    (
        "library_book_returns_total",
        "Total number of book returns",
        &["book_category", "return_status", "is_late"],
    ),
    (
        "library_book_reservations_total",
        "Total number of book reservations",
        &["book_category", "user_role"],
    ),
    (
        "library_user_registrations_total",
        "Total number of user registrations",
        &["user_role", "registration_source"],
    ),
    (
        "library_user_logins_total",
        "Total number of user logins",
        &["user_role", "login_method"],
    ),
    (
        "library_user_searches_total",
        "Total number of catalog searches",
        &["search_type", "user_role"],
    ),
    (
        "library_fines_collected_total",
        "Total number of fine payments",
        &["fine_type", "payment_method"],
    ),
    (
        "library_cache_operations_total",
        "Total number of cache operations",
        &["operation", "cache_name", "hit_miss"],
    ),
    (
        "library_api_requests_total",
        "Total number of API requests",
        &["method", "status_class"],
    ),
    (
        "library_errors_total",
        "Total number of recorded errors",
        &["error_type"],
    ),
];

struct CounterFamily {
    vec: IntCounterVec,
    total: AtomicU64,
}

/// Summary of a rolling duration sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    /// Samples currently held
    pub count: usize,
    /// Mean in milliseconds
    pub avg_ms: f64,
    /// 95th percentile in milliseconds
    pub p95_ms: f64,
    /// 99th percentile in milliseconds
    pub p99_ms: f64,
}

/// Thread-safe registry of library event counters and duration samples
pub struct MetricCollector {
    enabled: bool,
    registry: Registry,
    counters: BTreeMap<&'static str, CounterFamily>,
    fines_amount: Gauge,
    api_duration: Histogram,
    api_requests: AtomicU64,
    api_errors: AtomicU64,
    samples: Mutex<HashMap<String, VecDeque<f64>>>,
    sample_capacity: usize,
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl MetricCollector {
    /// Register every counter family and the request histogram in a fresh registry
    pub fn new(config: &MonitoringConfig) -> Result<Self> {
        let registry = Registry::new();

        let mut counters = BTreeMap::new();
        for (name, help, labels) in COUNTER_DEFINITIONS {
            let vec = IntCounterVec::new(Opts::new(*name, *help), labels)?;
            registry.register(Box::new(vec.clone()))?;
            counters.insert(
                *name,
                CounterFamily {
                    vec,
                    total: AtomicU64::new(0),
                },
            );
        }

        let fines_amount = Gauge::new(
            "library_fines_amount_total",
            "Total amount of collected fines",
        )?;
        registry.register(Box::new(fines_amount.clone()))?;

        let api_duration = Histogram::with_opts(
            HistogramOpts::new(
                "library_api_request_duration_seconds",
                "API request duration in seconds",
            )
            .buckets(API_DURATION_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(api_duration.clone()))?;

        Ok(Self {
            enabled: config.enabled,
            registry,
            counters,
            fines_amount,
            api_duration,
            api_requests: AtomicU64::new(0),
            api_errors: AtomicU64::new(0),
            samples: Mutex::new(HashMap::new()),
            sample_capacity: config.sample_capacity.max(1),
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }

    /// Registry holding every collector metric
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Names of all known counters, in lexicographic order
    pub fn counter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.counters.keys().copied()
    }

    /// Add `delta` to a counter.
    ///
    /// Unknown counter names and malformed label sets are logged and dropped;
    /// recording a metric never fails the caller.
    pub fn increment(&self, counter_name: &str, labels: &[(&str, &str)], delta: u64) {
        if !self.enabled {
            return;
        }

        let Some(family) = self.counters.get(counter_name) else {
            warn!(counter = counter_name, "Ignoring increment of unknown counter");
            return;
        };

        let label_map: HashMap<&str, &str> = labels.iter().copied().collect();
        match family.vec.get_metric_with(&label_map) {
            Ok(counter) => {
                counter.inc_by(delta);
                family.total.fetch_add(delta, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(
                    counter = counter_name,
                    error = %e,
                    "Ignoring increment with malformed labels"
                );
            }
        }
    }

    /// Append a duration to the rolling sample for `metric_name`
    pub fn record_duration(&self, metric_name: &str, seconds: f64) {
        if !self.enabled {
            return;
        }
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(metric = metric_name, seconds, "Ignoring invalid duration");
            return;
        }

        if metric_name == API_REQUEST_SAMPLE {
            self.api_duration.observe(seconds);
        }

        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let sample = samples.entry(metric_name.to_string()).or_default();
        sample.push_back(seconds * 1000.0);
        while sample.len() > self.sample_capacity {
            sample.pop_front();
        }
    }

    /// Average and percentiles of a rolling sample, `None` if nothing was recorded
    pub fn duration_stats(&self, metric_name: &str) -> Option<DurationStats> {
        let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let sample = samples.get(metric_name).filter(|s| !s.is_empty())?;

        let mut sorted: Vec<f64> = sample.iter().copied().collect();
        drop(samples);
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let avg_ms = sorted.iter().sum::<f64>() / count as f64;
        let (p95_ms, p99_ms) = if count >= MIN_SAMPLES_FOR_PERCENTILES {
            let p95_idx = (count as f64 * 0.95) as usize;
            let p99_idx = (count as f64 * 0.99) as usize;
            (sorted[p95_idx.min(count - 1)], sorted[p99_idx.min(count - 1)])
        } else {
            (0.0, 0.0)
        };

        Some(DurationStats {
            count,
            avg_ms,
            p95_ms,
            p99_ms,
        })
    }

    /// Sum of a counter over every label set, `None` for unknown counters
    pub fn counter_total(&self, counter_name: &str) -> Option<u64> {
        self.counters
            .get(counter_name)
            .map(|family| family.total.load(Ordering::Relaxed))
    }

    /// Value of a counter for one label set
    pub fn counter_value(&self, counter_name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let family = self.counters.get(counter_name)?;
        let label_map: HashMap<&str, &str> = labels.iter().copied().collect();
        family.vec.get_metric_with(&label_map).ok().map(|c| c.get())
    }

    /// Record a completed API request
    pub fn track_api_request(&self, method: &str, status_code: u16, duration: Duration) {
        if !self.enabled {
            return;
        }

        let status_class = match status_code {
            100..=199 => "1xx",
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        self.increment(
            "library_api_requests_total",
            &[("method", method), ("status_class", status_class)],
            1,
        );
        self.api_requests.fetch_add(1, Ordering::Relaxed);

        if status_code >= 500 {
            self.api_errors.fetch_add(1, Ordering::Relaxed);
            self.increment("library_errors_total", &[("error_type", "server")], 1);
        }

        self.record_duration(API_REQUEST_SAMPLE, duration.as_secs_f64());
    }

    /// Record a user login
    pub fn track_user_login(&self, user_role: &str, login_method: &str) {
        self.increment(
            "library_user_logins_total",
            &[("user_role", user_role), ("login_method", login_method)],
            1,
        );
    }

    /// Record a catalog search
    pub fn track_search_query(&self, search_type: &str, user_role: &str) {
        self.increment(
            "library_user_searches_total",
            &[("search_type", search_type), ("user_role", user_role)],
            1,
        );
    }

    /// Record a fine payment and add its amount to the collected total
    pub fn track_fine_payment(&self, amount: f64, fine_type: &str, payment_method: &str) {
        if !self.enabled {
            return;
        }
        if !amount.is_finite() || amount < 0.0 {
            warn!(amount, "Ignoring fine payment with invalid amount");
            return;
        }

        self.increment(
            "library_fines_collected_total",
            &[("fine_type", fine_type), ("payment_method", payment_method)],
            1,
        );
        self.fines_amount.add(amount);
    }

    /// Total amount of collected fines
    pub fn fines_collected_amount(&self) -> f64 {
        self.fines_amount.get()
    }

    /// Record a cache lookup outcome
    pub fn track_cache_operation(&self, operation: &str, cache_name: &str, hit: bool) {
        self.increment(
            "library_cache_operations_total",
            &[
                ("operation", operation),
                ("cache_name", cache_name),
                ("hit_miss", if hit { "hit" } else { "miss" }),
            ],
            1,
        );
    }

    /// Number of tracked API requests
    pub fn api_requests(&self) -> u64 {
        self.api_requests.load(Ordering::Relaxed)
    }

    /// Percentage of tracked API requests that ended in a server error
    pub fn error_rate_percent(&self) -> f64 {
        let requests = self.api_requests.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        let errors = self.api_errors.load(Ordering::Relaxed);
        errors as f64 / requests as f64 * 100.0
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
