//! Baseline suite: generate a report per sample case and compare it with the stored one
//!
//! Layout, for each grammar kind folder (`source`, `form`):
//!
//! ```text
//! <cases>/<kind>/<name>.<ext>            sample documents
//! <baselines>/<kind>/<name>.baseline.txt approved reports
//! <generated>/<kind>/<name>.baseline.txt reports from the latest run
//! ```
//!
//! The generated folder is wiped at the start of every run so it only ever holds
//! the latest reports, ready to be copied over the approved ones.

use super::error::BaselineError;
use super::registry::GrammarRegistry;
use super::report::generate_report;
use crate::grammar::GrammarKind;
use crate::scan::LineTokenizer;
use crate::settings::BaselineSettings;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const BASELINE_EXTENSION: &str = "baseline.txt";

/// Where cases, approved baselines and generated reports live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineLayout {
    pub cases: PathBuf,
    pub baselines: PathBuf,
    pub generated: PathBuf,
}

impl BaselineLayout {
    pub fn from_settings(settings: &BaselineSettings) -> Self {
        BaselineLayout {
            cases: settings.cases.clone(),
            baselines: settings.baselines.clone(),
            generated: settings.generated.clone(),
        }
    }

    /// Standard `cases`/`baselines`/`generated` folders under `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        BaselineLayout {
            cases: root.join("cases"),
            baselines: root.join("baselines"),
            generated: root.join("generated"),
        }
    }

    pub fn baseline_file(&self, kind: GrammarKind, file: &str) -> PathBuf {
        self.baselines.join(kind.folder()).join(file)
    }

    pub fn generated_file(&self, kind: GrammarKind, file: &str) -> PathBuf {
        self.generated.join(kind.folder()).join(file)
    }

    /// Remove previous output and recreate the per-kind folders.
    pub fn prepare_generated(&self) -> Result<(), BaselineError> {
        if self.generated.exists() {
            fs::remove_dir_all(&self.generated)
                .map_err(|e| BaselineError::io(&self.generated, e))?;
        }
        for kind in GrammarKind::ALL {
            let folder = self.generated.join(kind.folder());
            fs::create_dir_all(&folder).map_err(|e| BaselineError::io(&folder, e))?;
        }
        Ok(())
    }

    /// Sample files of one kind, sorted by name. A missing folder has no cases.
    pub fn cases(&self, kind: GrammarKind) -> Result<Vec<PathBuf>, BaselineError> {
        let folder = self.cases.join(kind.folder());
        if !folder.is_dir() {
            warn!(%kind, folder = %folder.display(), "no case folder");
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&folder).map_err(|e| BaselineError::io(&folder, e))?;
        let mut cases = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BaselineError::io(&folder, e))?.path();
            if path.is_file() {
                cases.push(path);
            }
        }
        cases.sort();
        Ok(cases)
    }
}

/// Name of the report file for a case: its file stem plus `.baseline.txt`
pub fn baseline_file_name(case: &Path) -> String {
    let stem = case
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.{BASELINE_EXTENSION}")
}

/// Result of one sample case
#[derive(Debug)]
pub struct CaseOutcome {
    pub kind: GrammarKind,
    pub case: PathBuf,
    /// Report file name, shared by the generated and approved copies
    pub file: String,
    pub result: Result<(), BaselineError>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct SuiteSummary {
    /// Sorted by kind, then report file name
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Write `generated` next to the other generated reports and compare it with the
/// approved baseline.
pub fn assert_matches_baseline(
    layout: &BaselineLayout,
    kind: GrammarKind,
    file: &str,
    generated: &str,
) -> Result<(), BaselineError> {
    let generated_path = layout.generated_file(kind, file);
    fs::write(&generated_path, generated).map_err(|e| BaselineError::io(&generated_path, e))?;

    let baseline_path = layout.baseline_file(kind, file);
    if !baseline_path.exists() {
        return Err(BaselineError::MissingBaseline {
            file: file.to_string(),
        });
    }
    let approved =
        fs::read_to_string(&baseline_path).map_err(|e| BaselineError::io(&baseline_path, e))?;
    if approved != generated {
        return Err(BaselineError::BaselineMismatch {
            file: file.to_string(),
        });
    }
    Ok(())
}

/// Generate and check the report of one case file.
pub fn check_case<T: LineTokenizer + 'static>(
    registry: &GrammarRegistry<T>,
    layout: &BaselineLayout,
    kind: GrammarKind,
    case: &Path,
) -> Result<(), BaselineError> {
    let text = fs::read_to_string(case).map_err(|e| BaselineError::io(case, e))?;
    let report = generate_report(registry, case, &text)?;
    assert_matches_baseline(layout, kind, &baseline_file_name(case), &report.to_string())
}

pub struct BaselineSuite<T> {
    registry: Arc<GrammarRegistry<T>>,
    layout: BaselineLayout,
}

impl<T: LineTokenizer + 'static> BaselineSuite<T> {
    pub fn new(registry: Arc<GrammarRegistry<T>>, layout: BaselineLayout) -> Self {
        BaselineSuite { registry, layout }
    }

    pub fn layout(&self) -> &BaselineLayout {
        &self.layout
    }

    /// Run every case concurrently. Only failing to set up the generated folder or to
    /// list cases aborts the run; per-case failures land in the summary.
    pub async fn run(&self) -> Result<SuiteSummary, BaselineError> {
        self.layout.prepare_generated()?;

        let mut tasks = JoinSet::new();
        for kind in GrammarKind::ALL {
            for case in self.layout.cases(kind)? {
                let registry = Arc::clone(&self.registry);
                let layout = self.layout.clone();
                tasks.spawn_blocking(move || {
                    let file = baseline_file_name(&case);
                    debug!(%kind, %file, "checking case");
                    let result = check_case(&registry, &layout, kind, &case);
                    CaseOutcome {
                        kind,
                        case,
                        file,
                        result,
                    }
                });
            }
        }

        let mut summary = SuiteSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| BaselineError::Task(e.to_string()))?;
            if let Err(err) = &outcome.result {
                warn!(kind = %outcome.kind, file = %outcome.file, error = %err, "baseline case failed");
            }
            summary.outcomes.push(outcome);
        }
        summary
            .outcomes
            .sort_by(|a, b| (a.kind, &a.file).cmp(&(b.kind, &b.file)));

        info!(
            cases = summary.outcomes.len(),
            passed = summary.passed(),
            "baseline suite finished"
        );
        Ok(summary)
    }
}
