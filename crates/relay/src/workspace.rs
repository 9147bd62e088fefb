//! Per-request working directories for downloads and parts.

use std::path::{Path, PathBuf};

use {tracing::debug, uuid::Uuid};

/// Fallback when a resource name sanitises to nothing usable.
const FALLBACK_NAME: &str = "download";

/// Where one request writes its artifact and parts.
#[derive(Debug, Clone)]
pub struct RequestWorkspace {
    dir: PathBuf,
    isolated: bool,
}

impl RequestWorkspace {
    /// Create the working directory: `<download_dir>/<request_id>` when
    /// `isolated`, otherwise `download_dir` itself.
    pub async fn create(
        download_dir: &Path,
        request_id: Uuid,
        isolated: bool,
    ) -> std::io::Result<Self> {
        let dir = if isolated {
            download_dir.join(request_id.to_string())
        } else {
            download_dir.to_path_buf()
        };
        tokio::fs::create_dir_all(&dir).await?;
        debug!(path = %dir.display(), isolated, "prepared workspace");
        Ok(Self { dir, isolated })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path for a resource called `name`.
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(sanitize_file_name(name))
    }

    /// Remove the request's files. An isolated workspace is removed whole;
    /// a shared one only loses the listed files.
    pub async fn cleanup(&self, files: &[PathBuf]) -> std::io::Result<()> {
        if self.isolated {
            return tokio::fs::remove_dir_all(&self.dir).await;
        }
        for file in files {
            match tokio::fs::remove_file(file).await {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Make a store-provided name safe to use as a single path component.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}
