use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Where generated audio and uploaded reference clips live on disk
#[derive(Debug, Clone)]
pub struct AudioStorage {
    output_dir: PathBuf,
    upload_dir: PathBuf,
}

impl AudioStorage {
    pub fn new(output_dir: impl Into<PathBuf>, upload_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let storage = Self {
            output_dir: output_dir.into(),
            upload_dir: upload_dir.into(),
        };
        std::fs::create_dir_all(&storage.output_dir)?;
        std::fs::create_dir_all(&storage.upload_dir)?;
        Ok(storage)
    }

    /// Fresh `audio_<YYYYmmdd_HHMMSS>_<8 hex>.wav` name and its full path
    pub fn new_output(&self) -> (String, PathBuf) {
        let id = Uuid::new_v4().simple().to_string();
        let filename = format!("audio_{}_{}.wav", Utc::now().format("%Y%m%d_%H%M%S"), &id[..8]);
        let path = self.output_dir.join(&filename);
        (filename, path)
    }

    /// Store an uploaded reference clip. The file is removed when the
    /// returned guard is dropped.
    pub async fn save_upload(&self, bytes: &[u8]) -> io::Result<UploadedReference> {
        let filename = format!("speaker_{}.wav", Uuid::new_v4().simple());
        let path = self.upload_dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Speaker reference stored");
        Ok(UploadedReference { path })
    }

    /// Map a client supplied name to a generated file, if it is a plain file
    /// name that exists in the output directory
    pub fn resolve_download(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
            || filename.starts_with('.')
        {
            return None;
        }

        let path = self.output_dir.join(filename);
        path.is_file().then_some(path)
    }

    /// Delete generated files last modified at least `max_age` ago
    pub async fn sweep(&self, max_age: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.output_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "Could not remove expired audio"),
            }
        }

        Ok(removed)
    }
}

/// Uploaded speaker reference, deleted on drop
#[derive(Debug)]
pub struct UploadedReference {
    path: PathBuf,
}

impl UploadedReference {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UploadedReference {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Speaker reference removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Could not remove speaker reference"),
        }
    }
}

/// Periodically delete generated audio older than `max_age`
pub fn spawn_retention_sweeper(storage: Arc<AudioStorage>, max_age: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            match storage.sweep(max_age).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed = removed, "Expired audio files removed"),
                Err(e) => tracing::warn!(error = %e, "Retention sweep failed"),
            }
        }
    })
}
