//! Load a JSONL evaluation log fully into memory.
//!
//! Lines that fail to parse into an [`EvalRecord`] are skipped with a
//! warning; they never count toward the record total. Paths ending in
//! `.zst` are decoded with zstd, and paths containing glob metacharacters
//! are expanded first.

use crate::record::EvalRecord;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// An input log after loading.
#[derive(Debug)]
pub struct LoadedLog {
    /// The file actually read (after glob expansion).
    pub path: PathBuf,
    pub records: Vec<EvalRecord>,
    /// Non-blank lines rejected by the record schema.
    pub skipped: usize,
}

/// Resolve an input argument to a concrete file.
///
/// A plain path must exist. A pattern such as
/// `outputs/baseline_*/output.jsonl` is expanded and the lexicographically
/// last match is used.
pub fn resolve_input(arg: &Path) -> Result<PathBuf, LoadError> {
    let text = arg.to_string_lossy();
    if !text.contains(['*', '?', '[']) {
        if !arg.exists() {
            return Err(LoadError::NotFound {
                path: arg.to_path_buf(),
            });
        }
        return Ok(arg.to_path_buf());
    }

    let entries = glob::glob(&text).map_err(|e| LoadError::BadPattern {
        pattern: text.to_string(),
        source: e,
    })?;
    let mut matches: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
    matches.sort();

    match matches.pop() {
        Some(chosen) => {
            if !matches.is_empty() {
                tracing::warn!(
                    pattern = %text,
                    chosen = %chosen.display(),
                    candidates = matches.len() + 1,
                    "pattern matched several files, using the last"
                );
            }
            Ok(chosen)
        }
        None => Err(LoadError::NoMatch {
            pattern: text.to_string(),
        }),
    }
}

/// Resolve and load a log.
pub fn load_jsonl(arg: &Path) -> Result<LoadedLog, LoadError> {
    let path = resolve_input(arg)?;
    let mut reader = open_reader(&path).map_err(|e| LoadError::Io {
        path: path.clone(),
        source: e,
    })?;

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| LoadError::Io {
            path: path.clone(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        line_no += 1;

        // Bytes that are not UTF-8 cannot be JSON; same treatment as bad syntax.
        let parsed = match std::str::from_utf8(&buf) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                EvalRecord::from_line(text).map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!(
                    file = %path.display(),
                    line = line_no,
                    error = %e,
                    "skipping unparseable record"
                );
            }
        }
    }

    tracing::debug!(
        file = %path.display(),
        records = records.len(),
        skipped,
        "loaded evaluation log"
    );

    Ok(LoadedLog {
        path,
        records,
        skipped,
    })
}

/// Open a log for line reading, decoding zstd when the name ends in `.zst`.
pub fn open_reader(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = std::fs::File::open(path)?;
    let is_zst = path.extension().and_then(|e| e.to_str()) == Some("zst");
    let inner: Box<dyn Read> = if is_zst {
        Box::new(zstd::Decoder::new(file)?)
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(inner)))
}

/// Errors from resolving or reading an input log.
#[derive(Debug)]
pub enum LoadError {
    NotFound {
        path: PathBuf,
    },
    NoMatch {
        pattern: String,
    },
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound { path } => write!(f, "file does not exist: {}", path.display()),
            LoadError::NoMatch { pattern } => write!(f, "no file matches pattern: {pattern}"),
            LoadError::BadPattern { pattern, source } => {
                write!(f, "invalid path pattern {pattern}: {source}")
            }
            LoadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::NotFound { .. } | LoadError::NoMatch { .. } => None,
            LoadError::BadPattern { source, .. } => Some(source),
            LoadError::Io { source, .. } => Some(source),
        }
    }
}
