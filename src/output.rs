/// Output locations for rendered charts.
///
/// `OutputPathResolver` is pure: it maps a group key (plus the station's
/// display name) to a path under the configured root according to the
/// `OutputLayout`. `plan` turns a batch of series into render jobs and makes
/// the paths collision-free. Directory creation is a separate step
/// (`create_parent_dirs`) run once per distinct parent before any chart is
/// written.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::{GroupKey, OutputLayout, RenderJob, TimeSeries};

/// Directory the per-station layouts write under.
pub const CHART_DIR: &str = "Grafieken";

/// Name used in per-station layouts for a series that spans all stations.
pub const ALL_STATIONS_NAME: &str = "alle_stations";

const EXTENSION: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPathResolver {
    root: PathBuf,
    layout: OutputLayout,
}

impl OutputPathResolver {
    pub fn new(root: impl Into<PathBuf>, layout: OutputLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Path for one group.
    ///
    /// `station_name` falls back to the station id when absent, and to
    /// `ALL_STATIONS_NAME` for keys without a station.
    pub fn resolve(&self, key: &GroupKey, station_name: Option<&str>) -> PathBuf {
        let tag = key.pollutant.file_tag();

        match self.layout {
            OutputLayout::Flat => self.root.join(format!("{}_concentratie.{}", tag, EXTENSION)),
            OutputLayout::PerStation => self
                .root
                .join(CHART_DIR)
                .join(format!("{}_{}.{}", tag, station_component(key, station_name), EXTENSION)),
            OutputLayout::PerStationPerPollutant => self
                .root
                .join(CHART_DIR)
                .join(key.pollutant.dir_name())
                .join(format!("{}_{}.{}", tag, station_component(key, station_name), EXTENSION)),
        }
    }

    /// Builds one render job per series, with every output path distinct.
    ///
    /// A station-scoped series whose path collides gets `_{stationId}`
    /// appended to the file stem. A suffixed path can land on another
    /// series' plain path, so this repeats until no station-scoped path
    /// collides; anything still shared after that gets a counter.
    pub fn plan(&self, series: Vec<TimeSeries>) -> Vec<RenderJob> {
        let mut paths: Vec<PathBuf> = series
            .iter()
            .map(|s| self.resolve(&s.key, s.station_name.as_deref()))
            .collect();
        let mut suffixed = vec![false; series.len()];

        loop {
            let colliding = colliding_paths(&paths);
            let mut changed = false;

            for (index, s) in series.iter().enumerate() {
                let Some(station) = &s.key.station else { continue };
                if suffixed[index] || !colliding.contains(&paths[index]) {
                    continue;
                }
                tracing::debug!(path = %paths[index].display(), %station, "disambiguating colliding chart path");
                paths[index] = with_stem_suffix(&paths[index], &sanitize_file_component(station.as_str()));
                suffixed[index] = true;
                changed = true;
            }

            if !changed {
                break;
            }
        }

        let mut taken: HashSet<PathBuf> = HashSet::with_capacity(paths.len());
        for index in 0..paths.len() {
            if taken.insert(paths[index].clone()) {
                continue;
            }
            let mut counter = 2;
            let unique = loop {
                let candidate = with_stem_suffix(&paths[index], &counter.to_string());
                if !taken.contains(&candidate) && !paths[index + 1..].contains(&candidate) {
                    break candidate;
                }
                counter += 1;
            };
            tracing::warn!(path = %paths[index].display(), unique = %unique.display(), "chart path still shared, numbering it");
            taken.insert(unique.clone());
            paths[index] = unique;
        }

        series
            .into_iter()
            .zip(paths)
            .map(|(series, output_path)| RenderJob {
                key: series.key.clone(),
                output_path,
                series,
            })
            .collect()
    }
}

/// Paths that occur more than once.
fn colliding_paths(paths: &[PathBuf]) -> HashSet<PathBuf> {
    let mut occurrences: HashMap<&Path, usize> = HashMap::new();
    for path in paths {
        *occurrences.entry(path.as_path()).or_default() += 1;
    }
    occurrences
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(path, _)| path.to_path_buf())
        .collect()
}

fn station_component(key: &GroupKey, station_name: Option<&str>) -> String {
    match (&key.station, station_name) {
        (_, Some(name)) if !name.trim().is_empty() => sanitize_file_component(name),
        (Some(station), _) => sanitize_file_component(station.as_str()),
        (None, _) => ALL_STATIONS_NAME.to_string(),
    }
}

fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_{}.{}", stem, suffix, EXTENSION))
}

/// Makes a station name safe to use as part of a file name: path
/// separators and control characters become `_`, and a name that is empty
/// or made only of dots becomes `_`.
pub fn sanitize_file_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Distinct parent directories of the jobs, in sorted order.
pub fn distinct_parent_dirs(jobs: &[RenderJob]) -> Vec<PathBuf> {
    jobs.iter()
        .filter_map(|job| job.output_path.parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Creates every parent directory the jobs need, once each. Returns the
/// directories that could not be created.
pub fn create_parent_dirs(jobs: &[RenderJob]) -> BTreeMap<PathBuf, io::Error> {
    let mut failed = BTreeMap::new();

    for dir in distinct_parent_dirs(jobs) {
        match fs::create_dir_all(&dir) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "output directory ready"),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "cannot create output directory");
                failed.insert(dir, e);
            }
        }
    }

    failed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
