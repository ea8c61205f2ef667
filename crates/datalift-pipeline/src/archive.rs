//! Incremental gzip+tar decoding over a remote byte stream.
//!
//! [`ArchiveStream`] layers `flate2` and `tar` over any async reader and
//! yields entries one at a time: a lazy, forward-only sequence that is
//! consumed at most once and never materializes the whole archive. The
//! decoders are synchronous, so decoding runs on a blocking task behind a
//! [`SyncIoBridge`]; entries cross back over a bounded channel, which keeps
//! memory bounded to a handful of entry bodies regardless of archive size.

use std::io::Read;

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::SyncIoBridge;

use flate2::read::GzDecoder;

const ENTRY_CHANNEL_DEPTH: usize = 4;

/// Entry classification from the tar header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file with content.
    File,
    /// Anything else: directories, links, fifos, pax/gnu metadata.
    Other,
}

impl EntryKind {
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// One decoded tar entry. Exists for the duration of a single decode step.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Relative path as recorded in the tar header.
    pub path: String,
    pub kind: EntryKind,
    /// Size from the tar header.
    pub size: u64,
    /// Entry content; empty for non-file entries.
    pub data: Vec<u8>,
}

/// Decode failure at some point in the stream. Entries yielded before this
/// point are valid and are not rolled back by the caller.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive stream: {0}")]
    Format(String),
}

/// A lazy, forward-only stream of tar entries decoded from gzip input.
///
/// Dropping the stream aborts decoding and releases the underlying reader.
pub struct ArchiveStream {
    rx: mpsc::Receiver<Result<ArchiveEntry, ArchiveError>>,
}

impl ArchiveStream {
    /// Start decoding `reader` as a gzip-compressed tar stream.
    pub fn open<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(ENTRY_CHANNEL_DEPTH);
        let bridge = SyncIoBridge::new(reader);
        tokio::task::spawn_blocking(move || decode_entries(bridge, tx));
        Self { rx }
    }

    /// Next entry in stream order, or `None` once the archive is exhausted.
    /// After an `Err` the stream yields nothing further.
    pub async fn next_entry(&mut self) -> Option<Result<ArchiveEntry, ArchiveError>> {
        self.rx.recv().await
    }
}

fn decode_entries<R: Read>(reader: R, tx: mpsc::Sender<Result<ArchiveEntry, ArchiveError>>) {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(e) => {
            let _ = tx.blocking_send(Err(ArchiveError::Format(e.to_string())));
            return;
        }
    };

    for entry in entries {
        let result = read_entry(entry);
        let failed = result.is_err();
        if tx.blocking_send(result).is_err() || failed {
            // Receiver dropped (early abort) or the stream is unusable past
            // this point; stop and let the reader drop.
            return;
        }
    }
}

fn read_entry<R: Read>(
    entry: std::io::Result<tar::Entry<'_, GzDecoder<R>>>,
) -> Result<ArchiveEntry, ArchiveError> {
    let mut entry = entry.map_err(|e| ArchiveError::Format(e.to_string()))?;

    let path = entry
        .path()
        .map_err(|e| ArchiveError::Format(e.to_string()))?
        .to_string_lossy()
        .into_owned();

    let kind = if entry.header().entry_type().is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    let size = entry.size();
    let mut data = Vec::new();
    if kind.is_file() {
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::Format(e.to_string()))?;
    }

    Ok(ArchiveEntry {
        path,
        kind,
        size,
        data,
    })
}
