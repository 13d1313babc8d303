use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// Transient local files of one extraction run.
///
/// Each run gets its own UUID-namespaced paths under the scratch directory, so
/// concurrent runs never alias files. All paths are deleted at job teardown,
/// whether they were actually created or not.
#[derive(Debug)]
pub struct ExtractionJob {
    job_key: String,
    input_path: PathBuf,
    headshot_path: PathBuf,
    headshot_no_bg_path: PathBuf,
    paper_path: PathBuf,
}

impl ExtractionJob {
    /// # Arguments
    /// - `scratch_dir`: directory receiving the transient files of this run
    /// - `job_key`: key of the raw image in the object storage
    pub fn new(scratch_dir: &Path, job_key: &str) -> Self {
        // The local input keeps the extension of the job key so decoders that
        // sniff by extension still work on it.
        let extension = Path::new(job_key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_string();

        Self {
            job_key: job_key.to_string(),
            input_path: scratch_dir.join(format!("{}.{}", Uuid::new_v4(), extension)),
            headshot_path: scratch_dir.join(format!("{}_headshot.jpg", Uuid::new_v4())),
            headshot_no_bg_path: scratch_dir.join(format!("{}_rembg.png", Uuid::new_v4())),
            paper_path: scratch_dir.join(format!("{}_paper.jpg", Uuid::new_v4())),
        }
    }

    pub fn job_key(&self) -> &str {
        &self.job_key
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn headshot_path(&self) -> &Path {
        &self.headshot_path
    }

    pub fn headshot_no_bg_path(&self) -> &Path {
        &self.headshot_no_bg_path
    }

    pub fn paper_path(&self) -> &Path {
        &self.paper_path
    }

    fn transient_paths(&self) -> [&Path; 4] {
        [
            &self.input_path,
            &self.headshot_path,
            &self.headshot_no_bg_path,
            &self.paper_path,
        ]
    }

    /// Deletes every transient file of this job.
    ///
    /// Must be called on every run path, success or failure. Never fails: a path
    /// that was never created (stage skipped or failed early) is silently ignored,
    /// any other removal error is only logged.
    pub fn cleanup(&self) {
        for path in self.transient_paths() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    warn!(?error, path = %path.display(), "Failed to remove transient file");
                }
            }
        }
    }
}
