//! Path confinement and chunked copy helpers.

use crate::constants::TEMP_FILE_PREFIX;
use path_absolutize::Absolutize;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Returns the lexically normalised absolute form of `path`.
///
/// `.` and `..` segments are collapsed without touching the filesystem, so the path does not
/// need to exist. Relative paths are resolved against the process working directory.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

/// Resolves `filename` against `root` and returns it only if it is a direct child of `root`.
///
/// `root` must already be absolute and normalised. Traversal (`../x`), absolute overrides
/// (`/etc/passwd`), embedded directories (`a/b.txt`) and names that collapse onto the root
/// itself (`""`, `.`) all yield `None`.
pub(crate) fn confined_child(root: &Path, filename: &str) -> Option<PathBuf> {
    let candidate = absolute(&root.join(filename)).ok()?;
    if candidate.parent() == Some(root) {
        Some(candidate)
    } else {
        None
    }
}

/// Whether the final component of `path` uses the prefix reserved for in-flight uploads.
pub(crate) fn is_reserved_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_FILE_PREFIX))
}

/// Reads until at least one byte arrives or the source is exhausted.
pub(crate) fn read_chunk<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut [u8],
) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Copies `reader` into `writer` one buffer at a time, returning the bytes copied.
pub(crate) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        let n = read_chunk(reader, buffer)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }
}
