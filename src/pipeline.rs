/// End-to-end run: list stations, fetch, group, plan, render.
///
/// `run` never fails. Every recoverable condition is reported through the
/// injected `Reporter` and counted in the returned `RunReport`.

use std::sync::Arc;

use crate::analysis::groupings;
use crate::collector::ConcurrencyController;
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::measurements::MeasurementClient;
use crate::model::{DateRange, RenderJob};
use crate::output::{self, OutputPathResolver};
use crate::render::{ChartBackend, ChartRenderer, PlottersBackend};
use crate::report::{Reporter, RunReport, TracingReporter};
use crate::stations::{StationDirectoryClient, select_stations};
use crate::transport::{HttpTransport, Transport};

pub struct Pipeline {
    config: PipelineConfig,
    directory: StationDirectoryClient,
    controller: ConcurrencyController,
    resolver: OutputPathResolver,
    renderer: ChartRenderer,
}

impl Pipeline {
    /// Production wiring: `reqwest` transport, `plotters` backend and
    /// `tracing` reporter.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.request_timeout())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let backend = PlottersBackend::new(&config.chart)?;

        Ok(Self::with_parts(
            config.clone(),
            Arc::new(transport),
            Box::new(backend),
            Arc::new(TracingReporter),
        ))
    }

    pub fn with_parts(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
        backend: Box<dyn ChartBackend>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let upstream = config.upstream();
        let directory = StationDirectoryClient::new(Arc::clone(&transport), upstream.clone());
        let source = Arc::new(MeasurementClient::new(transport, upstream));
        let controller = ConcurrencyController::new(source, Arc::clone(&reporter))
            .with_max_parallelism(config.max_parallelism)
            .with_deadline(config.deadline());
        let resolver = OutputPathResolver::new(config.output_dir.clone(), config.layout);
        let renderer = ChartRenderer::new(backend, reporter);

        Pipeline {
            config,
            directory,
            controller,
            resolver,
            renderer,
        }
    }

    pub fn run(&self, range: &DateRange) -> RunReport {
        let mut report = RunReport::default();

        let stations = match self.directory.list_stations() {
            Ok(stations) => stations,
            Err(e) => {
                tracing::error!(error = %e, "continuing with zero stations");
                Vec::new()
            }
        };
        let stations = select_stations(stations, self.config.station_filter.as_deref());
        report.stations = stations.len();

        if stations.is_empty() {
            tracing::warn!("no stations selected, nothing to chart");
            return report;
        }

        tracing::info!(
            stations = stations.len(),
            pollutants = self.config.pollutants.len(),
            start = %range.start(),
            end = %range.end(),
            "fetching measurements"
        );
        let outcome = self.controller.collect(&stations, &self.config.pollutants, range);
        report.tasks = outcome.task_count();
        report.fetch_succeeded = outcome.successes.len();
        report.fetch_failed = outcome.failures.len();
        report.malformed_records = outcome.malformed.len();

        let series = groupings::group(outcome.successes, self.config.mode);
        report.groups = series.len();

        let jobs = self.resolver.plan(series);
        let unwritable = output::create_parent_dirs(&jobs);

        let (blocked, ready): (Vec<RenderJob>, Vec<RenderJob>) = jobs.into_iter().partition(|job| {
            job.output_path
                .parent()
                .is_some_and(|dir| unwritable.contains_key(dir))
        });

        for job in &blocked {
            if let Some((dir, e)) = job
                .output_path
                .parent()
                .and_then(|dir| unwritable.get(dir).map(|e| (dir, e)))
            {
                self.renderer.skip(job, format!("cannot create {}: {}", dir.display(), e));
            }
        }

        let summary = self.renderer.render_all(&ready);
        report.charts_written = summary.written.len();
        report.charts_failed = blocked.len() + summary.failed.len();

        tracing::info!(
            written = report.charts_written,
            failed = report.charts_failed,
            "rendering complete"
        );
        report
    }
}
