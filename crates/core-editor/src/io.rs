//! Buffer file I/O.
//!
//! Writes are atomic-by-rename: content goes to a sibling temporary file
//! which is renamed over the target, so a failed write never leaves a
//! half-written target and the buffer state is untouched on error.

use crate::encoding::{LineEnding, decode_lines, detect_charset, encode_lines};
use encoding_rs::Encoding;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}: is a directory")]
    IsDirectory(PathBuf),
    #[error("{0}: not a regular file")]
    NotRegular(PathBuf),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Placement of the buffer content relative to an existing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    Append,
    Prepend,
}

pub struct ReadResult {
    pub lines: Vec<String>,
    pub charset: &'static Encoding,
    pub format: LineEnding,
}

/// Read a file whole, detect its charset, and split into lines.
pub fn read_file(path: &Path) -> Result<ReadResult, ReadError> {
    let meta = fs::metadata(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_dir() {
        return Err(ReadError::IsDirectory(path.to_path_buf()));
    }
    if !meta.is_file() {
        return Err(ReadError::NotRegular(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let charset = detect_charset(&bytes);
    let (lines, format) = decode_lines(&bytes, charset);
    debug!(target = "editor.io", path = %path.display(), charset = charset.name(), format = format.label(), lines = lines.len(), "read");
    Ok(ReadResult {
        lines,
        charset,
        format,
    })
}

pub struct WriteRequest<'a> {
    pub path: &'a Path,
    pub lines: &'a [String],
    pub format: LineEnding,
    pub charset: &'static Encoding,
    pub mode: WriteMode,
    /// Rename an existing target to `<name>~` before the final rename.
    pub backup: bool,
}

/// Write the buffer. Returns the number of lines written.
pub fn write_file(req: &WriteRequest<'_>) -> Result<usize, WriteError> {
    let io_err = |source| WriteError::Io {
        path: req.path.to_path_buf(),
        source,
    };
    let mut content = encode_lines(req.lines, req.format, req.charset);
    if req.mode != WriteMode::Write && req.path.exists() {
        let existing = fs::read(req.path).map_err(io_err)?;
        match req.mode {
            WriteMode::Append => {
                let mut merged = existing;
                merged.extend_from_slice(&content);
                content = merged;
            }
            WriteMode::Prepend => content.extend_from_slice(&existing),
            WriteMode::Write => unreachable!(),
        }
    }
    let dir = req.path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".edit-")
        .suffix(".temp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    temp.write_all(&content).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    if req.backup && req.path.exists() {
        let mut backup = req.path.as_os_str().to_owned();
        backup.push("~");
        fs::rename(req.path, &backup).map_err(io_err)?;
    }
    temp.persist(req.path)
        .map_err(|e| io_err(e.error))?;
    debug!(target = "editor.io", path = %req.path.display(), mode = ?req.mode, lines = req.lines.len(), "write");
    Ok(req.lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let content = lines(&["alpha", "beta", ""]);
        write_file(&WriteRequest {
            path: &path,
            lines: &content,
            format: LineEnding::Unix,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Write,
            backup: false,
        })
        .unwrap();
        let read = read_file(&path).unwrap();
        assert_eq!(read.lines, content);
        assert_eq!(read.format, LineEnding::Unix);
    }

    #[test]
    fn dos_format_writes_exact_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_file(&WriteRequest {
            path: &path,
            lines: &lines(&["a", "b", ""]),
            format: LineEnding::Dos,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Write,
            backup: false,
        })
        .unwrap();
        assert_eq!(fs::read(&path).unwrap(), [0x61, 0x0d, 0x0a, 0x62, 0x0d, 0x0a]);
    }

    #[test]
    fn append_keeps_existing_content_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "old\n").unwrap();
        write_file(&WriteRequest {
            path: &path,
            lines: &lines(&["new", ""]),
            format: LineEnding::Unix,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Append,
            backup: false,
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn prepend_puts_buffer_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "old\n").unwrap();
        write_file(&WriteRequest {
            path: &path,
            lines: &lines(&["new", ""]),
            format: LineEnding::Unix,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Prepend,
            backup: false,
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\nold\n");
    }

    #[test]
    fn backup_renames_existing_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, "original\n").unwrap();
        write_file(&WriteRequest {
            path: &path,
            lines: &lines(&["fresh", ""]),
            format: LineEnding::Unix,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Write,
            backup: true,
        })
        .unwrap();
        let backup = dir.path().join("file.txt~");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn read_rejects_directories() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_file(dir.path()),
            Err(ReadError::IsDirectory(_))
        ));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_file(&dir.path().join("absent")),
            Err(ReadError::Io { .. })
        ));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_file(&WriteRequest {
            path: &path,
            lines: &lines(&["x"]),
            format: LineEnding::Unix,
            charset: encoding_rs::UTF_8,
            mode: WriteMode::Write,
            backup: false,
        })
        .unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.txt"]);
    }
}
