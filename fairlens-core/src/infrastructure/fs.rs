// fairlens-core/src/infrastructure/fs.rs

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::bias::AnalysisReport;
use crate::infrastructure::error::InfrastructureError;

pub const REPORT_FILE_NAME: &str = "bias_report.json";

/// Writes `content` through a temp file in the same directory, then renames
/// it over `path`. Readers never observe a half-written file.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Saves the report as pretty JSON under `target_dir`, replacing the
/// previous run's report wholesale.
pub fn save_report(target_dir: &Path, report: &AnalysisReport) -> Result<PathBuf, InfrastructureError> {
    std::fs::create_dir_all(target_dir)?;
    let path = target_dir.join(REPORT_FILE_NAME);
    atomic_write(&path, report.to_json()?)?;
    tracing::info!(path = ?path, "Bias report written");
    Ok(path)
}
