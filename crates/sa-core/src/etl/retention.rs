//! Pruning of superseded artifacts.

use sa_artifact::ARTIFACT_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Temp files older than this are leftovers from a crashed build.
const STALE_TMP_AGE: Duration = Duration::from_secs(15 * 60);

fn is_artifact(name: &str) -> bool {
    name.starts_with("calls-") && name.ends_with(&format!(".{ARTIFACT_EXTENSION}"))
}

fn is_artifact_tmp(name: &str) -> bool {
    name.starts_with("calls-") && name.ends_with(&format!(".{ARTIFACT_EXTENSION}.tmp"))
}

/// Remove artifacts in `dir` beyond the newest `retain`, never touching `live`.
/// Also removes stale temp files. Returns the removed paths.
///
/// Failures are logged and skipped; pruning never fails a publish.
pub fn prune_artifacts(dir: &Path, live: &Path, retain: usize) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list artifact dir");
            return Vec::new();
        }
    };

    let now = SystemTime::now();
    let mut artifacts: Vec<(SystemTime, PathBuf)> = Vec::new();
    let mut doomed: Vec<PathBuf> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if is_artifact(name) {
            if path != live {
                artifacts.push((modified, path));
            }
        } else if is_artifact_tmp(name)
            && now.duration_since(modified).unwrap_or_default() > STALE_TMP_AGE
        {
            doomed.push(path);
        }
    }

    // Newest first; the live artifact counts toward the retained total.
    artifacts.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    let keep = retain.saturating_sub(1);
    doomed.extend(artifacts.into_iter().skip(keep).map(|(_, path)| path));

    doomed
        .into_iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove old artifact");
                false
            }
        })
        .collect()
}
