//! Prometheus metrics for one sync run.
//!
//! All metrics follow the naming convention: `safe_sync_<metric>_<unit>`.
//! Each `RunMetrics` owns its registry, so a test can build as many as it
//! likes without colliding on global registration.

use std::time::Instant;

use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

/// Outcome label values for `safe_sync_proposals_total`.
pub mod outcome {
    pub const SUBMITTED: &str = "submitted";
    pub const SKIPPED: &str = "skipped";
    pub const FAILED: &str = "failed";
    pub const DRY_RUN: &str = "dry_run";
}

/// Entity change label values for `safe_sync_entities_committed_total`.
pub mod change {
    pub const CREATED: &str = "created";
    pub const EDITED: &str = "edited";
    pub const DELETED: &str = "deleted";
}

#[derive(Clone)]
pub struct RunMetrics {
    registry: Registry,

    /// Safes whose state was refreshed from the transaction service.
    pub safes_synced: IntCounter,
    /// Safes whose refresh failed and whose proposals were excluded.
    pub safe_sync_failures: IntCounter,
    /// Top-level proposals given a nonce.
    pub proposals_scheduled: IntGauge,
    /// Processed proposals by outcome.
    pub proposals: IntCounterVec,
    /// Child approval proposals written.
    pub children_generated: IntCounter,
    /// Committed entity files by change kind.
    pub entities_committed: IntCounterVec,
    /// Wall time of the whole run.
    pub run_duration: Histogram,
}

fn metric_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

impl RunMetrics {
    pub fn new(service_name: &str) -> Result<Self, TelemetryError> {
        let registry = Registry::new_custom(Some("safe_sync".to_string()), None).map_err(metric_err)?;
        let service = |opts: Opts| opts.const_label("service", service_name);

        let safes_synced = IntCounter::with_opts(service(Opts::new(
            "safes_synced_total",
            "Safes refreshed from the transaction service",
        )))
        .map_err(metric_err)?;
        let safe_sync_failures = IntCounter::with_opts(service(Opts::new(
            "safe_sync_failures_total",
            "Safes whose refresh failed",
        )))
        .map_err(metric_err)?;
        let proposals_scheduled = IntGauge::with_opts(service(Opts::new(
            "proposals_scheduled",
            "Top-level proposals scheduled this run",
        )))
        .map_err(metric_err)?;
        let proposals = IntCounterVec::new(
            service(Opts::new("proposals_total", "Processed proposals by outcome")),
            &["outcome"],
        )
        .map_err(metric_err)?;
        let children_generated = IntCounter::with_opts(service(Opts::new(
            "children_generated_total",
            "Child approval proposals written",
        )))
        .map_err(metric_err)?;
        let entities_committed = IntCounterVec::new(
            service(Opts::new(
                "entities_committed_total",
                "Entity files committed by change kind",
            )),
            &["change"],
        )
        .map_err(metric_err)?;
        let run_duration = Histogram::with_opts(
            HistogramOpts::new("run_duration_seconds", "Wall time of a sync run")
                .const_label("service", service_name)
                .buckets(exponential_buckets(0.5, 2.0, 10).map_err(metric_err)?),
        )
        .map_err(metric_err)?;

        registry.register(Box::new(safes_synced.clone())).map_err(metric_err)?;
        registry.register(Box::new(safe_sync_failures.clone())).map_err(metric_err)?;
        registry.register(Box::new(proposals_scheduled.clone())).map_err(metric_err)?;
        registry.register(Box::new(proposals.clone())).map_err(metric_err)?;
        registry.register(Box::new(children_generated.clone())).map_err(metric_err)?;
        registry.register(Box::new(entities_committed.clone())).map_err(metric_err)?;
        registry.register(Box::new(run_duration.clone())).map_err(metric_err)?;

        Ok(Self {
            registry,
            safes_synced,
            safe_sync_failures,
            proposals_scheduled,
            proposals,
            children_generated,
            entities_committed,
            run_duration,
        })
    }

    pub fn record_proposal(&self, outcome: &str) {
        self.proposals.with_label_values(&[outcome]).inc();
    }

    pub fn record_commit(&self, created: usize, edited: usize, deleted: usize) {
        for (label, count) in [
            (change::CREATED, created),
            (change::EDITED, edited),
            (change::DELETED, deleted),
        ] {
            self.entities_committed
                .with_label_values(&[label])
                .inc_by(count as u64);
        }
    }

    /// Start timing the run. Observation happens on drop.
    pub fn time_run(&self) -> HistogramTimer {
        HistogramTimer::new(&self.run_duration)
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_err)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
