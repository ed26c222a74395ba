//! Chart rendering.
//!
//! `ChartRenderer` shapes a `RenderJob` into what a `ChartBackend` needs
//! (UTC x values, y values, labels, output path) and turns backend errors
//! into reported `RenderFailed`s. `PlottersBackend` draws PNG line charts
//! with `plotters`.
//!
//! Text (title, axis descriptions, tick labels, legend) needs a font file.
//! Without `chart.font_path` only the data line is drawn.

use chrono::{Duration, NaiveDateTime};
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ChartConfig;
use crate::error::{ConfigError, RenderFailed};
use crate::model::{RenderJob, TimeSeries};
use crate::report::Reporter;

/// Font family name fonts are registered under.
const FONT_FAMILY: &str = "sans-serif";

/// Text shown on one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLabels {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub legend: String,
}

impl ChartLabels {
    pub fn for_series(series: &TimeSeries) -> Self {
        let label = series.key.pollutant.label();
        let title = match &series.key.station {
            Some(station) => {
                let name = series
                    .station_name
                    .clone()
                    .unwrap_or_else(|| station.to_string());
                format!("{} Concentratie bij Station {}", label, name)
            }
            None => format!("{} Concentratie over Tijd", label),
        };

        ChartLabels {
            title,
            x_axis: "Tijd".to_string(),
            y_axis: format!("{} Concentratie (µg/m³)", label),
            legend: label.to_string(),
        }
    }
}

/// Draws one series and encodes it to `output`.
pub trait ChartBackend {
    fn render_series(
        &self,
        points: &[(NaiveDateTime, f64)],
        labels: &ChartLabels,
        output: &Path,
    ) -> Result<(), Box<dyn Error>>;
}

// ---------------------------------------------------------------------------
// Plotters backend
// ---------------------------------------------------------------------------

pub struct PlottersBackend {
    size: (u32, u32),
    with_text: bool,
}

impl PlottersBackend {
    /// Builds the backend, registering the configured font if any.
    pub fn new(config: &ChartConfig) -> Result<Self, ConfigError> {
        let with_text = match &config.font_path {
            Some(path) => {
                let bytes = fs::read(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                // The font registry holds `'static` data for the process lifetime.
                let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                register_font(FONT_FAMILY, FontStyle::Normal, bytes).map_err(|_| {
                    ConfigError::Invalid(format!("{} is not a usable font file", path.display()))
                })?;
                true
            }
            None => {
                tracing::info!("no chart font configured, charts will be drawn without text");
                false
            }
        };

        Ok(PlottersBackend {
            size: (config.width, config.height),
            with_text,
        })
    }
}

/// Axis bounds with padding; a single instant or a flat line still gets a
/// non-empty range.
fn axis_bounds(points: &[(NaiveDateTime, f64)]) -> Option<((NaiveDateTime, NaiveDateTime), (f64, f64))> {
    let first = points.first()?;
    let (mut t_min, mut t_max) = (first.0, first.0);
    let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (t, v) in points {
        t_min = t_min.min(*t);
        t_max = t_max.max(*t);
        v_min = v_min.min(*v);
        v_max = v_max.max(*v);
    }

    if t_min == t_max {
        t_min -= Duration::hours(1);
        t_max += Duration::hours(1);
    }
    let padding = if (v_max - v_min).abs() > 1e-6 {
        (v_max - v_min) * 0.1
    } else {
        1.0
    };

    Some(((t_min, t_max), (v_min - padding, v_max + padding)))
}

impl ChartBackend for PlottersBackend {
    fn render_series(
        &self,
        points: &[(NaiveDateTime, f64)],
        labels: &ChartLabels,
        output: &Path,
    ) -> Result<(), Box<dyn Error>> {
        let ((t_min, t_max), (y_min, y_max)) = axis_bounds(points).ok_or("no points to plot")?;

        let root = BitMapBackend::new(output, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if self.with_text {
            builder
                .caption(&labels.title, (FONT_FAMILY, 28).into_font())
                .x_label_area_size(50)
                .y_label_area_size(70);
        }
        let mut chart = builder.build_cartesian_2d(RangedDateTime::from(t_min..t_max), y_min..y_max)?;

        if self.with_text {
            chart
                .configure_mesh()
                .x_desc(labels.x_axis.as_str())
                .y_desc(labels.y_axis.as_str())
                .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%Y-%m-%d").to_string())
                .light_line_style(BLACK.mix(0.15))
                .draw()?;
        }

        let line = chart.draw_series(LineSeries::new(points.iter().copied(), BLUE))?;

        if self.with_text {
            line.label(labels.legend.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Charts written and charts skipped by one `render_all` call.
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<RenderFailed>,
}

pub struct ChartRenderer {
    backend: Box<dyn ChartBackend>,
    reporter: Arc<dyn Reporter>,
}

impl ChartRenderer {
    pub fn new(backend: Box<dyn ChartBackend>, reporter: Arc<dyn Reporter>) -> Self {
        Self { backend, reporter }
    }

    /// Renders one job. A backend failure is reported and returned, never
    /// raised further.
    pub fn render(&self, job: &RenderJob) -> Result<PathBuf, RenderFailed> {
        if job.series.points.is_empty() {
            return Err(self.skip(job, "series has no points"));
        }

        let points: Vec<(NaiveDateTime, f64)> = job
            .series
            .points
            .iter()
            .map(|(ts, v)| (ts.naive_utc(), *v))
            .collect();
        let labels = ChartLabels::for_series(&job.series);

        match self.backend.render_series(&points, &labels, &job.output_path) {
            Ok(()) => {
                self.reporter.chart_written(&job.key, &job.output_path);
                Ok(job.output_path.clone())
            }
            Err(e) => Err(self.skip(job, e.to_string())),
        }
    }

    /// Renders every job in order; one failure does not stop the rest.
    pub fn render_all(&self, jobs: &[RenderJob]) -> RenderSummary {
        let mut summary = RenderSummary::default();
        for job in jobs {
            match self.render(job) {
                Ok(path) => summary.written.push(path),
                Err(failure) => summary.failed.push(failure),
            }
        }
        summary
    }

    /// Records a job as not rendered without calling the backend.
    pub fn skip(&self, job: &RenderJob, cause: impl Into<String>) -> RenderFailed {
        let failure = RenderFailed {
            group_key: job.key.clone(),
            cause: cause.into(),
        };
        self.reporter.render_failed(&failure);
        failure
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
