//! Aggregation cycle: poll every source, isolate failures, pick one value per metric.

use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    config::Unit,
    error::{Metric, MetricError},
    model::AggregationReport,
    provider::{ProviderId, SourceReader},
    report::{ReportSink, render},
};

/// A metric value computed by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution<T> {
    pub source: ProviderId,
    pub value: T,
}

/// First contribution in configured order wins.
pub fn select_first<T>(contributions: Vec<Contribution<T>>) -> Option<Contribution<T>> {
    contributions.into_iter().next()
}

/// The longest sequence wins; ties go to the earlier source.
pub fn select_most_complete<T>(
    contributions: Vec<Contribution<Vec<T>>>,
) -> Option<Contribution<Vec<T>>> {
    contributions.into_iter().fold(None, |best, candidate| match best {
        Some(best) if best.value.len() >= candidate.value.len() => Some(best),
        _ => Some(candidate),
    })
}

/// Run one cycle over `readers` in order.
///
/// A reader whose fetch fails is skipped entirely. Otherwise each metric is computed on its
/// own, so one failing query never hides the other two.
pub async fn collect(readers: &mut [Box<dyn SourceReader>]) -> AggregationReport {
    let mut pressures = Vec::new();
    let mut temperatures = Vec::new();
    let mut rains = Vec::new();

    for reader in readers.iter_mut() {
        let source = reader.id();

        if !reader.fetch().await {
            info!(source = %source, "No forecast from source this cycle");
            continue;
        }

        match reader.average_pressure() {
            Ok(value) => pressures.push(Contribution { source, value }),
            Err(err) => metric_failed(source, Metric::Pressure, &err),
        }

        match reader.average_temperature() {
            Ok(value) if !value.is_empty() => temperatures.push(Contribution { source, value }),
            Ok(_) => debug!(source = %source, metric = %Metric::Temperature, "No day buckets"),
            Err(err) => metric_failed(source, Metric::Temperature, &err),
        }

        match reader.rain_intervals() {
            Ok(value) if !value.is_empty() => rains.push(Contribution { source, value }),
            Ok(_) => debug!(source = %source, metric = %Metric::Rain, "No rain expected"),
            Err(err) => metric_failed(source, Metric::Rain, &err),
        }
    }

    AggregationReport {
        pressure: chosen(Metric::Pressure, select_first(pressures)),
        temperature_by_day: chosen(Metric::Temperature, select_most_complete(temperatures)),
        rain_intervals: chosen(Metric::Rain, select_most_complete(rains)),
    }
}

fn metric_failed(source: ProviderId, metric: Metric, err: &MetricError) {
    warn!(source = %source, metric = %metric, error = %err, "Metric computation failed");
}

fn chosen<T>(metric: Metric, contribution: Option<Contribution<T>>) -> Option<T> {
    match contribution {
        Some(Contribution { source, value }) => {
            debug!(source = %source, metric = %metric, "Selected contribution");
            Some(value)
        }
        None => {
            info!(metric = %metric, "No source contributed");
            None
        }
    }
}

/// Marks a cycle as running; cleared on drop, even if the cycle task panics.
#[derive(Debug)]
struct CycleGuard(Arc<AtomicBool>);

impl CycleGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically runs aggregation cycles and renders each report.
#[derive(Clone)]
pub struct Monitor {
    readers: Arc<Mutex<Vec<Box<dyn SourceReader>>>>,
    sink: Arc<Mutex<Box<dyn ReportSink>>>,
    unit: Unit,
    poll_interval: Duration,
    in_flight: Arc<AtomicBool>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("unit", &self.unit)
            .field("poll_interval", &self.poll_interval)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new(
        readers: Vec<Box<dyn SourceReader>>,
        sink: Box<dyn ReportSink>,
        unit: Unit,
        poll_interval: Duration,
    ) -> Self {
        Self {
            readers: Arc::new(Mutex::new(readers)),
            sink: Arc::new(Mutex::new(sink)),
            unit,
            poll_interval,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run a single cycle inline and render its report.
    pub async fn run_once(&self) -> AggregationReport {
        let report = {
            let mut readers = self.readers.lock().await;
            collect(&mut readers).await
        };

        let mut sink = self.sink.lock().await;
        render(&report, self.unit, &mut **sink);

        report
    }

    /// Spawn a cycle unless one is still in flight.
    pub fn try_start_cycle(&self) -> Option<JoinHandle<AggregationReport>> {
        let guard = CycleGuard::acquire(&self.in_flight)?;
        let monitor = self.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            monitor.run_once().await
        }))
    }

    /// Start a cycle on every tick, the first immediately, until `shutdown` resolves.
    ///
    /// Ticks are spaced from cycle start, so a slow cycle may still be running at the next
    /// tick; that tick is skipped. A cycle in flight at shutdown is awaited so its report is
    /// still rendered.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.poll_interval.as_secs_f64(),
            "Weather monitor started"
        );

        let mut last_cycle: Option<JoinHandle<AggregationReport>> = None;

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping monitor");
                    break;
                }
                _ = ticker.tick() => match self.try_start_cycle() {
                    Some(handle) => last_cycle = Some(handle),
                    None => warn!("Previous cycle still running, skipping tick"),
                }
            }
        }

        if let Some(handle) = last_cycle.filter(|h| !h.is_finished()) {
            info!("Waiting for the running cycle to finish");
            if let Err(err) = handle.await {
                warn!(error = %err, "Cycle task failed");
            }
        }
    }
}
