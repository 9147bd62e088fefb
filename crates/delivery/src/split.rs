use std::path::{Path, PathBuf};

use {
    serde::Serialize,
    tokio::{
        fs::File,
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter},
    },
    tracing::{debug, info},
};

use crate::{Error, Result};

/// One contiguous slice of an artifact, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl Chunk {
    /// File name shown to the recipient, e.g. `movie.mkv.part2`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("part{}", self.index))
    }
}

/// Parts of one artifact in delivery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.size_bytes).sum()
    }
}

impl IntoIterator for ChunkSet {
    type IntoIter = std::vec::IntoIter<Chunk>;
    type Item = Chunk;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

/// Path of part `index` of `file`: `<file>.part<index>`.
#[must_use]
pub fn part_path(file: &Path, index: usize) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(format!(".part{index}"));
    PathBuf::from(name)
}

/// Split `path` into consecutive parts of at most `max_chunk_bytes` each.
///
/// Reads forward once, holding only the I/O buffers in memory. Parts are
/// written in index order next to the source file. A file whose length is an
/// exact multiple of `max_chunk_bytes` yields no trailing empty part, and an
/// empty file yields no parts at all. On error, parts already written stay
/// on disk.
pub async fn split_file(path: &Path, max_chunk_bytes: u64) -> Result<ChunkSet> {
    if max_chunk_bytes == 0 {
        return Err(Error::invalid_input("max chunk size must be positive"));
    }

    let source = File::open(path)
        .await
        .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
    let mut reader = BufReader::new(source);
    let mut set = ChunkSet::default();

    loop {
        let at_eof = reader
            .fill_buf()
            .await
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?
            .is_empty();
        if at_eof {
            break;
        }

        let index = set.len() + 1;
        let chunk_path = part_path(path, index);
        let size_bytes = write_part(&mut reader, &chunk_path, max_chunk_bytes).await?;
        debug!(part = index, path = %chunk_path.display(), size_bytes, "wrote part");
        set.chunks.push(Chunk {
            index,
            path: chunk_path,
            size_bytes,
        });
    }

    info!(
        path = %path.display(),
        parts = set.len(),
        total_bytes = set.total_bytes(),
        "split complete"
    );
    Ok(set)
}

async fn write_part(
    reader: &mut BufReader<File>,
    chunk_path: &Path,
    max_chunk_bytes: u64,
) -> Result<u64> {
    let file = File::create(chunk_path)
        .await
        .map_err(|e| Error::io(format!("creating {}", chunk_path.display()), e))?;
    let mut writer = BufWriter::new(file);
    let copied = tokio::io::copy_buf(&mut reader.take(max_chunk_bytes), &mut writer)
        .await
        .map_err(|e| Error::io(format!("writing {}", chunk_path.display()), e))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::io(format!("flushing {}", chunk_path.display()), e))?;
    Ok(copied)
}
