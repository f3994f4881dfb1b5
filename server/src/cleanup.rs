use joblib::config::JOB_DIR_PREFIX;
use std::io;
use std::path::Path;

/// Delete job directories left in `workdir` by a previous server run.
/// Returns how many were removed.
pub fn remove_job_dirs(workdir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(workdir)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_job = name
            .to_str()
            .map_or(false, |name| name.starts_with(JOB_DIR_PREFIX));
        if !is_job || !entry.file_type()?.is_dir() {
            continue;
        }
        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                tracing::info!(path = %entry.path().display(), "removed job directory");
                removed += 1;
            }
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "unable to remove job directory")
            }
        }
    }
    Ok(removed)
}
