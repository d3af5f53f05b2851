// logcore - mmap.rs
//
// Read-only memory-mapped file, scoped acquisition via RAII: `Drop` on
// `memmap2::Mmap` unmaps the region, so there is no explicit `close()` a
// caller can forget to call, and no leak path through early returns or
// errors during `open`.

use crate::error::LoaderError;
use crate::simd::ByteScanner;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct MappedFile {
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl MappedFile {
    /// Map `path` read-only. An empty file maps to a zero-length region,
    /// not an error, so callers can observe "zero batches, clean shutdown"
    /// on an empty input.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| LoaderError::Io {
            path: path.clone(),
            operation: "open",
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| LoaderError::Io {
                path: path.clone(),
                operation: "stat",
                source,
            })?
            .len();

        if len == 0 {
            return Ok(Self { mmap: None, path });
        }

        // Safety: the file is opened read-only above and not concurrently
        // truncated by this process; memmap2 documents the general risk of
        // external modification, which this crate accepts as it does for
        // any other file-backed input.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| LoaderError::Io {
            path: path.clone(),
            operation: "mmap",
            source,
        })?;

        Ok(Self {
            mmap: Some(mmap),
            path,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(m) => &m[..],
            None => &[],
        }
    }

    pub fn size(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_open(&self) -> bool {
        true
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A scanner cursor over the mapped region. The returned scanner
    /// borrows from `self` and cannot outlive the mapping.
    pub fn scanner(&self) -> ByteScanner<'_> {
        ByteScanner::new(self.as_bytes())
    }

    /// Explicit release, ahead of drop, matching the source's scoped
    /// `close()`. Equivalent to dropping the mapping immediately.
    pub fn close(&mut self) {
        self.mmap = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn maps_and_reads_file_contents() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "hello\nworld").unwrap();
        let mapped = MappedFile::open(f.path()).unwrap();
        assert_eq!(mapped.as_bytes(), b"hello\nworld\n");
    }

    #[test]
    fn empty_file_maps_to_zero_length_region() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let mapped = MappedFile::open(f.path()).unwrap();
        assert_eq!(mapped.size(), 0);
        assert!(mapped.as_bytes().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MappedFile::open("/nonexistent/path/does/not/exist.log");
        assert!(matches!(err, Err(LoaderError::Io { operation: "open", .. })));
    }

    #[test]
    fn scanner_walks_mapped_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "a\nb\nc").unwrap();
        let mapped = MappedFile::open(f.path()).unwrap();
        let mut sc = mapped.scanner();
        assert_eq!(sc.next_line(), Some(b"a".as_ref()));
        assert_eq!(sc.next_line(), Some(b"b".as_ref()));
        assert_eq!(sc.next_line(), Some(b"c".as_ref()));
        assert_eq!(sc.next_line(), None);
    }
}
