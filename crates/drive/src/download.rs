use std::path::{Path, PathBuf};

use {
    futures::StreamExt,
    tokio::io::AsyncWriteExt,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    store::{ResourceId, ResourceStore},
};

/// Stream a resource from `store` into `dest`.
///
/// Bytes land in `<dest>.partial` first and are renamed into place once the
/// stream ends cleanly, so `dest` never holds a truncated file. The partial
/// file is removed when the stream or a write fails. Returns the number of
/// bytes written.
pub async fn download(store: &dyn ResourceStore, id: &ResourceId, dest: &Path) -> Result<u64> {
    let tmp_path = partial_path(dest);
    match stream_to(store, id, &tmp_path).await {
        Ok(written) => {
            tokio::fs::rename(&tmp_path, dest)
                .await
                .map_err(|e| Error::io(format!("renaming {}", tmp_path.display()), e))?;
            info!(resource_id = %id, path = %dest.display(), bytes = written, "download complete");
            Ok(written)
        },
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&tmp_path).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %tmp_path.display(), error = %rm, "failed to remove partial download");
            }
            Err(e)
        },
    }
}

async fn stream_to(store: &dyn ResourceStore, id: &ResourceId, path: &Path) -> Result<u64> {
    let mut stream = store.open_read_stream(id).await?;
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::io(format!("creating {}", path.display()), e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io("writing chunk", e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| Error::io("flushing file", e))?;
    debug!(resource_id = %id, bytes = written, "stream drained");
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::store::{ByteStream, ResourceMetadata},
        async_trait::async_trait,
        bytes::Bytes,
        futures::stream,
    };

    /// Store that yields preset chunks, optionally failing after them.
    struct ScriptedStore {
        chunks: Vec<&'static str>,
        fail_after: bool,
    }

    #[async_trait]
    impl ResourceStore for ScriptedStore {
        async fn fetch_metadata(&self, _id: &ResourceId) -> Result<ResourceMetadata> {
            unreachable!("download never asks for metadata")
        }

        async fn open_read_stream(&self, _id: &ResourceId) -> Result<ByteStream> {
            let mut items: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            if self.fail_after {
                items.push(Err(Error::stream(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "peer reset",
                ))));
            }
            Ok(stream::iter(items).boxed())
        }
    }

    #[tokio::test]
    async fn writes_all_chunks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        let store = ScriptedStore {
            chunks: vec!["hello ", "drive ", "world"],
            fail_after: false,
        };

        let written = download(&store, &ResourceId::new("x"), &dest).await.unwrap();

        assert_eq!(written, 17);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello drive world");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn stream_error_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("movie.mkv");
        let store = ScriptedStore {
            chunks: vec!["partial bytes"],
            fail_after: true,
        };

        let err = download(&store, &ResourceId::new("x"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Stream { .. }));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nope").join("file.bin");
        let store = ScriptedStore {
            chunks: vec!["x"],
            fail_after: false,
        };

        let err = download(&store, &ResourceId::new("x"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/tmp/a.tar.gz")),
            PathBuf::from("/tmp/a.tar.gz.partial")
        );
    }
}
