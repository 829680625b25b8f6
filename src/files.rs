//! Text file read/write tools.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

/// The only encoding the file tools accept.
pub const SUPPORTED_ENCODING: &str = "utf-8";

/// How `write_file` opens its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `w`: create or truncate.
    Overwrite,
    /// `x`: create, failing if the file already exists.
    CreateNew,
    /// `a`: append on a new line, creating the file if needed.
    Append,
}

impl FromStr for WriteMode {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w" => Ok(Self::Overwrite),
            "x" => Ok(Self::CreateNew),
            "a" => Ok(Self::Append),
            other => Err(FileError::InvalidMode(other.to_string())),
        }
    }
}

/// File tool errors.
#[derive(Debug)]
pub enum FileError {
    /// Underlying I/O failure, tagged with the path.
    Io { path: String, source: io::Error },
    /// Mode was not one of `w`, `x`, `a`.
    InvalidMode(String),
    /// Encoding other than UTF-8 requested.
    UnsupportedEncoding(String),
    /// File contents were not valid UTF-8.
    InvalidUtf8(String),
    /// Insert position outside `1..=lines + 1`.
    LineOutOfRange(usize),
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path, source),
            Self::InvalidMode(mode) => {
                write!(f, "invalid mode '{}' (expected 'w', 'x' or 'a')", mode)
            }
            Self::UnsupportedEncoding(enc) => {
                write!(f, "unsupported encoding '{}' (only utf-8)", enc)
            }
            Self::InvalidUtf8(path) => write!(f, "{}: file is not valid utf-8", path),
            Self::LineOutOfRange(line) => write!(f, "line number {} is out of range", line),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Accept `utf-8` in its common spellings.
pub fn check_encoding(encoding: &str) -> Result<(), FileError> {
    match encoding.to_ascii_lowercase().replace('_', "-").as_str() {
        "utf-8" | "utf8" => Ok(()),
        _ => Err(FileError::UnsupportedEncoding(encoding.to_string())),
    }
}

/// Read lines `[start, end)` of a text file, keeping line terminators.
///
/// Indices follow slice semantics where negative values count from the end
/// and out-of-range values clamp. `\n`, `\r\n` and a bare `\r` all end a line.
pub fn read_file(path: &Path, start: i64, end: Option<i64>) -> Result<String, FileError> {
    let text = read_text(path)?;

    let lines = split_lines(&text);
    let (from, to) = slice_bounds(lines.len(), start, end);
    debug!(path = %path.display(), from, to, total = lines.len(), "read_file");

    Ok(lines[from..to].concat())
}

/// Write text to a file according to `mode`.
pub fn write_file(path: &Path, mode: WriteMode, content: &str) -> Result<String, FileError> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Overwrite => options.write(true).create(true).truncate(true),
        WriteMode::CreateNew => options.write(true).create_new(true),
        WriteMode::Append => options.append(true).create(true),
    };

    let io_err = |source: io::Error| FileError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = options.open(path).map_err(io_err)?;
    if mode == WriteMode::Append {
        file.write_all(b"\n").map_err(io_err)?;
    }
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    debug!(path = %path.display(), ?mode, bytes = content.len(), "write_file");

    Ok(format!("Content successfully written to {}", path.display()))
}

/// Write `points` as a numbered list, one per line, replacing the file.
pub fn create_outline(path: &Path, points: &[String]) -> Result<String, FileError> {
    let outline: String = points
        .iter()
        .enumerate()
        .map(|(i, point)| format!("{}. {}\n", i + 1, point))
        .collect();
    fs::write(path, outline).map_err(|source| FileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), points = points.len(), "create_outline");

    Ok(format!("Outline saved to {}", path.display()))
}

/// Insert lines of text before the given 1-indexed line numbers.
///
/// Inserts apply in ascending line order, each against the document as
/// left by the previous one. Any position past the end plus one fails the
/// whole edit and leaves the file untouched.
pub fn edit_document(path: &Path, inserts: &BTreeMap<usize, String>) -> Result<String, FileError> {
    let text = read_text(path)?;
    let mut lines: Vec<String> = split_lines(&text).into_iter().map(String::from).collect();

    for (&line, insert) in inserts {
        if line == 0 || line > lines.len() + 1 {
            return Err(FileError::LineOutOfRange(line));
        }
        if line == lines.len() + 1 {
            if let Some(last) = lines.last_mut() {
                if !last.ends_with(['\n', '\r']) {
                    last.push('\n');
                }
            }
        }
        lines.insert(line - 1, format!("{}\n", insert));
    }

    fs::write(path, lines.concat()).map_err(|source| FileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), inserts = inserts.len(), "edit_document");

    Ok(format!("Document edited and saved to {}", path.display()))
}

fn read_text(path: &Path) -> Result<String, FileError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|source| FileError::Io {
        path: display.clone(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| FileError::InvalidUtf8(display))
}

/// Split after every `\n`, `\r\n` or lone `\r`, keeping terminators.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut from = 0;
    let mut i = 0;
    while i < bytes.len() {
        let end = match bytes[i] {
            b'\n' => Some(i + 1),
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => Some(i + 2),
            b'\r' => Some(i + 1),
            _ => None,
        };
        match end {
            Some(end) => {
                lines.push(&text[from..end]);
                from = end;
                i = end;
            }
            None => i += 1,
        }
    }
    if from < text.len() {
        lines.push(&text[from..]);
    }
    lines
}

fn slice_bounds(len: usize, start: i64, end: Option<i64>) -> (usize, usize) {
    let clamp = |idx: i64| -> usize {
        if idx < 0 {
            (len as i64 + idx).max(0) as usize
        } else {
            (idx as usize).min(len)
        }
    };
    let from = clamp(start);
    let to = end.map(clamp).unwrap_or(len);
    (from, to.max(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("sample.txt");
        fs::write(&path, "one\ntwo\nthree\nfour").unwrap();
        path
    }

    #[test]
    fn test_read_whole_file() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        assert_eq!(read_file(&path, 0, None).unwrap(), "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_read_line_range() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        assert_eq!(read_file(&path, 1, Some(3)).unwrap(), "two\nthree\n");
        assert_eq!(read_file(&path, 2, Some(9998)).unwrap(), "three\nfour");
    }

    #[test]
    fn test_read_negative_indices() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        assert_eq!(read_file(&path, -2, None).unwrap(), "three\nfour");
        assert_eq!(read_file(&path, 0, Some(-3)).unwrap(), "one\n");
        assert_eq!(read_file(&path, 3, Some(1)).unwrap(), "");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_file(&dir.path().join("missing.txt"), 0, None).unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(read_file(&path, 0, None), Err(FileError::InvalidUtf8(_))));
    }

    #[test]
    fn test_write_overwrite_then_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");

        let msg = write_file(&path, WriteMode::Overwrite, "this is a test").unwrap();
        assert!(msg.starts_with("Content successfully written to"));
        write_file(&path, WriteMode::Append, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "this is a test\nsecond");

        write_file(&path, WriteMode::Overwrite, "fresh").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[test]
    fn test_create_new_refuses_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("once.txt");

        write_file(&path, WriteMode::CreateNew, "first").unwrap();
        let err = write_file(&path, WriteMode::CreateNew, "second").unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("w".parse::<WriteMode>().unwrap(), WriteMode::Overwrite);
        assert_eq!("x".parse::<WriteMode>().unwrap(), WriteMode::CreateNew);
        assert_eq!("a".parse::<WriteMode>().unwrap(), WriteMode::Append);
        assert!(matches!(
            "r+".parse::<WriteMode>(),
            Err(FileError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_encoding_check() {
        assert!(check_encoding("utf-8").is_ok());
        assert!(check_encoding("UTF8").is_ok());
        assert!(check_encoding("utf_8").is_ok());
        assert!(matches!(
            check_encoding("latin-1"),
            Err(FileError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_read_splits_on_every_line_ending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        fs::write(&path, "mac\rdos\r\nunix\nlast").unwrap();

        assert_eq!(read_file(&path, 0, Some(1)).unwrap(), "mac\r");
        assert_eq!(read_file(&path, 1, Some(2)).unwrap(), "dos\r\n");
        assert_eq!(read_file(&path, -1, None).unwrap(), "last");
    }

    #[test]
    fn test_create_outline_numbers_points() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outline.md");
        let points = vec!["Intro".to_string(), "Body".to_string(), "Wrap up".to_string()];

        let msg = create_outline(&path, &points).unwrap();
        assert!(msg.starts_with("Outline saved to"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "1. Intro\n2. Body\n3. Wrap up\n"
        );
    }

    #[test]
    fn test_edit_document_inserts_in_line_order() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let inserts = BTreeMap::from([
            (5, "tail".to_string()),
            (1, "head".to_string()),
            (3, "middle".to_string()),
        ]);

        let msg = edit_document(&path, &inserts).unwrap();
        assert!(msg.starts_with("Document edited and saved to"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "head\none\nmiddle\ntwo\ntail\nthree\nfour"
        );
    }

    #[test]
    fn test_edit_document_appends_after_last_line() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let inserts = BTreeMap::from([(5, "five".to_string())]);

        edit_document(&path, &inserts).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "one\ntwo\nthree\nfour\nfive\n"
        );
    }

    #[test]
    fn test_edit_document_rejects_out_of_range() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());

        for line in [0, 6] {
            let inserts = BTreeMap::from([(line, "x".to_string())]);
            let err = edit_document(&path, &inserts).unwrap_err();
            assert!(matches!(err, FileError::LineOutOfRange(l) if l == line));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\nfour");
    }
}
