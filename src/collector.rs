/// Bounded fan-out of per-(station, pollutant) fetch tasks.
///
/// Every task of the stations × pollutants product runs on a fixed-size
/// thread pool and sends exactly one result back over a channel. `collect`
/// is a full barrier: it returns once every task has reported, the
/// optional deadline has expired, or the workers are gone. Tasks that never
/// reported are recorded as failures, so
///
///   successes + failures == stations × pollutants
///
/// holds for every call. One task failing never cancels its siblings.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use threadpool::ThreadPool;

use crate::error::{FetchCause, FetchFailed, MalformedRecord};
use crate::measurements::{FetchedMeasurements, MeasurementSource};
use crate::model::{DateRange, Measurement, Pollutant, Station};
use crate::report::Reporter;

/// Default size of the fetch worker pool.
pub const DEFAULT_MAX_PARALLELISM: usize = 10;

/// Measurements of one completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSuccess {
    pub station: Station,
    pub pollutant: Pollutant,
    pub measurements: Vec<Measurement>,
}

/// Fan-in result of one `collect` call.
///
/// `successes` are in arrival order; `failures` list reported failures in
/// arrival order followed by tasks that never reported.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub successes: Vec<TaskSuccess>,
    pub failures: Vec<FetchFailed>,
    pub malformed: Vec<MalformedRecord>,
}

impl CollectOutcome {
    pub fn task_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

pub struct ConcurrencyController {
    source: Arc<dyn MeasurementSource>,
    reporter: Arc<dyn Reporter>,
    max_parallelism: usize,
    deadline: Option<Duration>,
}

type TaskResult = Result<FetchedMeasurements, FetchFailed>;

impl ConcurrencyController {
    pub fn new(source: Arc<dyn MeasurementSource>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            source,
            reporter,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            deadline: None,
        }
    }

    /// Caps concurrent fetches. Zero is treated as one.
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    /// Overall deadline for one `collect` call.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fetches every station × pollutant combination and waits for all of
    /// them to reach a terminal state.
    pub fn collect(&self, stations: &[Station], pollutants: &[Pollutant], range: &DateRange) -> CollectOutcome {
        let tasks: Vec<(Station, Pollutant)> = stations
            .iter()
            .flat_map(|station| pollutants.iter().map(move |p| (station.clone(), *p)))
            .collect();

        if tasks.is_empty() {
            tracing::info!("no fetch tasks to run");
            return CollectOutcome::default();
        }

        let workers = self.max_parallelism.min(tasks.len());
        tracing::info!(tasks = tasks.len(), workers, "dispatching fetch tasks");

        let pool = ThreadPool::with_name("fetch".to_string(), workers);
        let (tx, rx) = mpsc::channel::<(usize, TaskResult)>();

        for (index, (station, pollutant)) in tasks.iter().cloned().enumerate() {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let range = *range;
            pool.execute(move || {
                let result = source.fetch(&station.id, pollutant, &range);
                // The receiver is gone once the deadline has passed; a late
                // result is simply discarded.
                let _ = tx.send((index, result));
            });
        }
        // Only worker-held senders remain, so `recv` fails once every job
        // has finished or died.
        drop(tx);

        let started = Instant::now();
        let mut reported = vec![false; tasks.len()];
        let mut remaining = tasks.len();
        let mut arrivals: Vec<(usize, TaskResult)> = Vec::with_capacity(tasks.len());
        let mut timed_out = false;

        while remaining > 0 {
            let message = match self.deadline {
                Some(deadline) => match rx.recv_timeout(deadline.saturating_sub(started.elapsed())) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        timed_out = true;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            let (index, result) = message;
            if !reported[index] {
                reported[index] = true;
                remaining -= 1;
                arrivals.push((index, result));
            }
        }

        if timed_out {
            tracing::warn!(unfinished = remaining, "fetch deadline expired");
        } else if remaining > 0 {
            tracing::error!(unfinished = remaining, "fetch workers stopped without reporting");
        }

        let mut outcome = CollectOutcome::default();

        for (index, result) in arrivals {
            let (station, pollutant) = &tasks[index];
            match result {
                Ok(fetched) => {
                    outcome.malformed.extend(fetched.malformed);
                    outcome.successes.push(TaskSuccess {
                        station: station.clone(),
                        pollutant: *pollutant,
                        measurements: fetched.measurements,
                    });
                }
                Err(failure) => outcome.failures.push(failure),
            }
        }

        let missing_cause = if timed_out { FetchCause::Timeout } else { FetchCause::WorkerLost };
        for (index, (station, pollutant)) in tasks.iter().enumerate() {
            if !reported[index] {
                outcome.failures.push(FetchFailed {
                    station_id: station.id.clone(),
                    pollutant: *pollutant,
                    cause: missing_cause.clone(),
                });
            }
        }

        for failure in &outcome.failures {
            self.reporter.fetch_failed(failure);
        }
        for record in &outcome.malformed {
            self.reporter.malformed_record(record);
        }

        tracing::info!(
            succeeded = outcome.successes.len(),
            failed = outcome.failures.len(),
            malformed = outcome.malformed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch phase complete"
        );

        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StationId;
    use crate::report::testing::RecordingReporter;
    use chrono::DateTime;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn station(id: &str) -> Station {
        Station {
            id: StationId::from(id),
            name: format!("Station {}", id),
            raw_location_description: String::new(),
        }
    }

    fn stations(n: usize) -> Vec<Station> {
        (0..n).map(|i| station(&format!("S{}", i))).collect()
    }

    fn may_2023() -> DateRange {
        DateRange::parse("2023-05-01", "2023-05-07").unwrap()
    }

    fn reading(station: &StationId, pollutant: Pollutant, ts: &str, value: f64) -> Measurement {
        Measurement {
            station_id: station.clone(),
            pollutant,
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
            value,
        }
    }

    /// Source answering from a closure, optionally sleeping first.
    struct FnSource<F> {
        answer: F,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<(StationId, Pollutant)>>,
    }

    impl<F> FnSource<F>
    where
        F: Fn(&StationId, Pollutant) -> TaskResult + Send + Sync,
    {
        fn new(answer: F) -> Self {
            Self {
                answer,
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl<F> MeasurementSource for FnSource<F>
    where
        F: Fn(&StationId, Pollutant) -> TaskResult + Send + Sync,
    {
        fn fetch(&self, station: &StationId, pollutant: Pollutant, _range: &DateRange) -> TaskResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push((station.clone(), pollutant));
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            let result = (self.answer)(station, pollutant);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn empty_success(_: &StationId, _: Pollutant) -> TaskResult {
        Ok(FetchedMeasurements::default())
    }

    fn make_controller(source: Arc<dyn MeasurementSource>) -> (ConcurrencyController, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        (ConcurrencyController::new(source, reporter.clone()), reporter)
    }

    // --- Task accounting ----------------------------------------------------

    #[test]
    fn test_every_task_has_exactly_one_outcome() {
        for n in 0..6 {
            for pollutants in [&[Pollutant::Pm10][..], &Pollutant::ALL[..]] {
                let source = Arc::new(FnSource::new(|station: &StationId, _| {
                    if station.as_str().ends_with('1') {
                        Err(FetchFailed {
                            station_id: station.clone(),
                            pollutant: Pollutant::Pm10,
                            cause: FetchCause::Status(500),
                        })
                    } else {
                        Ok(FetchedMeasurements::default())
                    }
                }));
                let (controller, _) = make_controller(source.clone());
                let outcome = controller.collect(&stations(n), pollutants, &may_2023());

                assert_eq!(
                    outcome.task_count(),
                    n * pollutants.len(),
                    "{} stations × {} pollutants",
                    n,
                    pollutants.len()
                );
                assert_eq!(source.calls.lock().unwrap().len(), n * pollutants.len());
            }
        }
    }

    #[test]
    fn test_cartesian_product_is_dispatched_once_each() {
        let source = Arc::new(FnSource::new(empty_success));
        let (controller, _) = make_controller(source.clone());
        controller.collect(&stations(3), &Pollutant::ALL, &may_2023());

        let calls = source.calls.lock().unwrap();
        let unique: HashSet<_> = calls.iter().cloned().collect();
        assert_eq!(calls.len(), 6);
        assert_eq!(unique.len(), 6, "no task may run twice");
    }

    #[test]
    fn test_zero_stations_dispatches_nothing() {
        let source = Arc::new(FnSource::new(empty_success));
        let (controller, reporter) = make_controller(source.clone());
        let outcome = controller.collect(&[], &Pollutant::ALL, &may_2023());

        assert!(outcome.successes.is_empty());
        assert!(outcome.failures.is_empty());
        assert!(source.calls.lock().unwrap().is_empty());
        assert!(reporter.fetch_failures.lock().unwrap().is_empty());
    }

    // --- Failure isolation --------------------------------------------------

    #[test]
    fn test_failure_is_isolated_and_reported() {
        let source = Arc::new(FnSource::new(|station: &StationId, pollutant| {
            if station.as_str() == "S0" {
                Err(FetchFailed {
                    station_id: station.clone(),
                    pollutant,
                    cause: FetchCause::Status(500),
                })
            } else {
                Ok(FetchedMeasurements {
                    measurements: vec![reading(station, pollutant, "2023-05-01T00:00:00Z", 10.0)],
                    malformed: Vec::new(),
                })
            }
        }));
        let (controller, reporter) = make_controller(source);
        let outcome = controller.collect(&stations(2), &[Pollutant::Pm10], &may_2023());

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].station_id.as_str(), "S0");
        assert_eq!(outcome.successes.len(), 1);
        assert_eq!(outcome.successes[0].station.id.as_str(), "S1");
        assert_eq!(outcome.successes[0].measurements.len(), 1);
        assert_eq!(reporter.fetch_failures.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_records_are_collected_and_reported() {
        let source = Arc::new(FnSource::new(|station: &StationId, _| {
            Ok(FetchedMeasurements {
                measurements: Vec::new(),
                malformed: vec![MalformedRecord {
                    station_id: station.clone(),
                    reason: "unparseable timestamp".into(),
                }],
            })
        }));
        let (controller, reporter) = make_controller(source);
        let outcome = controller.collect(&stations(2), &[Pollutant::Pm10], &may_2023());

        assert_eq!(outcome.malformed.len(), 2);
        assert_eq!(outcome.successes.len(), 2, "malformed records do not fail the task");
        assert_eq!(reporter.malformed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_panicking_worker_is_recorded_as_worker_lost() {
        let source = Arc::new(FnSource::new(|station: &StationId, _| {
            if station.as_str() == "S1" {
                panic!("simulated worker crash");
            }
            Ok(FetchedMeasurements::default())
        }));
        let (controller, _) = make_controller(source);
        let outcome = controller.collect(&stations(3), &[Pollutant::Pm10], &may_2023());

        assert_eq!(outcome.task_count(), 3);
        assert_eq!(outcome.successes.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].station_id.as_str(), "S1");
        assert_eq!(outcome.failures[0].cause, FetchCause::WorkerLost);
    }

    // --- Bounded parallelism and deadline -------------------------------------

    #[test]
    fn test_parallelism_never_exceeds_limit() {
        let source = Arc::new(FnSource::new(empty_success).with_delay(Duration::from_millis(20)));
        let (controller, _) = make_controller(source.clone());
        let controller = controller.with_max_parallelism(3);
        controller.collect(&stations(12), &[Pollutant::Pm10], &may_2023());

        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "at most 3 fetches may run at once, saw {}", peak);
        assert!(peak >= 1);
    }

    #[test]
    fn test_zero_parallelism_is_treated_as_one() {
        let source = Arc::new(FnSource::new(empty_success).with_delay(Duration::from_millis(5)));
        let (controller, _) = make_controller(source.clone());
        let outcome = controller
            .with_max_parallelism(0)
            .collect(&stations(3), &[Pollutant::Pm10], &may_2023());

        assert_eq!(outcome.successes.len(), 3);
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deadline_marks_unfinished_tasks_as_timed_out() {
        let source = Arc::new(FnSource::new(|station: &StationId, _| {
            if station.as_str() == "S0" {
                thread::sleep(Duration::from_secs(2));
            }
            Ok(FetchedMeasurements::default())
        }));
        let (controller, reporter) = make_controller(source);
        let controller = controller.with_deadline(Some(Duration::from_millis(200)));

        let started = Instant::now();
        let outcome = controller.collect(&stations(3), &[Pollutant::Pm10], &may_2023());

        assert!(
            started.elapsed() < Duration::from_secs(2),
            "collect must not wait for the stuck task"
        );
        assert_eq!(outcome.task_count(), 3);
        assert_eq!(outcome.successes.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].station_id.as_str(), "S0");
        assert_eq!(outcome.failures[0].cause, FetchCause::Timeout);
        assert_eq!(reporter.fetch_failures.lock().unwrap().len(), 1);
    }
}
