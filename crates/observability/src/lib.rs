use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    submissions_total: AtomicU64,
    delivered_total: AtomicU64,
    failed_total: AtomicU64,
    rejected_in_flight_total: AtomicU64,
    invalid_total: AtomicU64,
    total_delivery_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub submissions_total: u64,
    pub delivered_total: u64,
    pub failed_total: u64,
    pub rejected_in_flight_total: u64,
    pub invalid_total: u64,
    pub avg_delivery_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_submission(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.delivered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_in_flight(&self) {
        self.rejected_in_flight_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_invalid(&self) {
        self.invalid_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_delivery(&self, duration: Duration) {
        self.total_delivery_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let delivered = self.delivered_total.load(Ordering::Relaxed);
        let failed = self.failed_total.load(Ordering::Relaxed);
        let attempts = delivered + failed;
        let latency = self.total_delivery_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            submissions_total: self.submissions_total.load(Ordering::Relaxed),
            delivered_total: delivered,
            failed_total: failed,
            rejected_in_flight_total: self.rejected_in_flight_total.load(Ordering::Relaxed),
            invalid_total: self.invalid_total.load(Ordering::Relaxed),
            avg_delivery_millis: if attempts == 0 {
                0.0
            } else {
                latency as f64 / attempts as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,ride_api=info,ride_booking=info,ride_notify=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

/// Plain-text variant for interactive terminals, written to stderr so it does
/// not interleave with prompts on stdout.
pub fn init_cli_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=warn,ride_booking=warn,ride_notify=warn",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    });
}
