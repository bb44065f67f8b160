// Report renderers

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SessionError;

use super::ReportInput;

/// Turns an assembled report into an artifact
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &ReportInput) -> Result<Vec<u8>, SessionError>;

    /// File name the artifact is saved under
    fn file_name(&self, report: &ReportInput) -> String {
        report.file_name.clone()
    }
}

/// Writes the report input as pretty-printed JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn render(&self, report: &ReportInput) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec_pretty(report).map_err(|err| SessionError::ReportFailure {
            reason: err.to_string(),
        })
    }

    fn file_name(&self, report: &ReportInput) -> String {
        Path::new(&report.file_name)
            .with_extension("json")
            .to_string_lossy()
            .into_owned()
    }
}

/// Render `report` and save it in `dir`, returning the written path
pub fn write_report(
    renderer: &dyn ReportRenderer,
    report: &ReportInput,
    dir: &Path,
) -> Result<PathBuf, SessionError> {
    let bytes = renderer.render(report)?;
    let path = dir.join(renderer.file_name(report));
    fs::write(&path, bytes).map_err(|err| SessionError::ReportFailure {
        reason: format!("{}: {}", path.display(), err),
    })?;
    log::info!("[Report] Wrote {}", path.display());
    Ok(path)
}
