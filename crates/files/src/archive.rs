//! Streaming zip assembly.
//!
//! [`ArchiveStream`] is a value describing "write these files as a zip to some sink". It does no
//! work until [`ArchiveStream::write_to`] is called, and then it never holds more than one copy
//! buffer of file content in memory: each entry's local header and compressed bytes go straight
//! to the sink, and the central directory follows at the end. The writer does not seek, so the
//! sink may be a socket, a pipe or a channel.

use crate::constants::COPY_BUFFER_SIZE;
use crate::paths::copy_chunked;
use crate::{StorageError, StorageResult};
use std::collections::HashSet;
use std::io::{self, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

type EntryOpener = Box<dyn Fn(&str) -> io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// Deferred zip producer over a backend's stored files.
///
/// Backends construct it with an opener that applies their own path confinement.
pub struct ArchiveStream {
    filenames: Vec<String>,
    open_entry: EntryOpener,
}

impl ArchiveStream {
    /// Creates a producer for `filenames` using `open_entry` to open each source.
    ///
    /// A zip cannot carry two entries with the same name, so repeated names collapse onto
    /// their first occurrence.
    pub fn new<F>(filenames: Vec<String>, open_entry: F) -> Self
    where
        F: Fn(&str) -> io::Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        let filenames = filenames
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self {
            filenames,
            open_entry: Box::new(open_entry),
        }
    }

    /// Entry names, in archive order.
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Writes the archive to `sink`.
    ///
    /// Entries are written in order, each named by its filename and deflated. The first entry
    /// that cannot be opened or copied aborts the whole archive; by then the sink has already
    /// received the earlier entries, so the caller must treat the output as invalid.
    ///
    /// The zip writer and the sink are dropped on every return path. On failure the writer
    /// still flushes a central directory into the sink as it drops.
    ///
    /// # Errors
    ///
    /// - `StorageError::ArchiveEntry` if a source cannot be opened, read or copied
    /// - `StorageError::ArchiveWrite` if the zip writer fails or the sink cannot be flushed
    pub fn write_to<W: Write>(self, mut sink: W) -> StorageResult<()> {
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        {
            let mut zip = ZipWriter::new_stream(&mut sink);

            for filename in &self.filenames {
                let mut source =
                    (self.open_entry)(filename).map_err(|source| entry_error(filename, source))?;

                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                zip.start_file(filename.as_str(), options)?;

                let copied = copy_chunked(&mut *source, &mut zip, &mut buffer)
                    .map_err(|source| entry_error(filename, source))?;
                tracing::debug!(filename = %filename, bytes = copied, "archive entry written");
            }

            zip.finish()?;
        }

        sink.flush()
            .map_err(|e| StorageError::ArchiveWrite(zip::result::ZipError::Io(e)))?;

        tracing::info!(entries = self.filenames.len(), "archive written");
        Ok(())
    }
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("filenames", &self.filenames)
            .finish_non_exhaustive()
    }
}

fn entry_error(filename: &str, source: io::Error) -> StorageError {
    tracing::warn!(filename = %filename, error = %source, "archive aborted");
    StorageError::ArchiveEntry {
        filename: filename.to_owned(),
        source,
    }
}
