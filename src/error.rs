use std::path::PathBuf;

use thiserror::Error;

/// Direction of a neighbor scan around an indel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Backward => write!(f, "before"),
            Direction::Forward => write!(f, "after"),
        }
    }
}

/// Errors raised while correcting or filtering indel records.
#[derive(Error, Debug)]
pub enum Error {
    #[error("line {line}: expected at least {expected} tab-separated columns, found {found}")]
    TooFewColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: INFO key {key} is missing")]
    MissingInfo { line: usize, key: &'static str },
    #[error("line {line}: could not parse {what} from '{value}'")]
    InvalidNumber {
        line: usize,
        what: &'static str,
        value: String,
    },
    #[error("no non-indel neighbor found {direction} the indel at line {line} (POS={position})")]
    NoNeighbor {
        line: usize,
        position: u64,
        direction: Direction,
    },
    #[error("record at {chrom}:{position} carries IMF but has no AD")]
    MissingAd { chrom: String, position: i64 },
    #[error("invalid AD at {chrom}:{position}: {value}")]
    InvalidAd {
        chrom: String,
        position: i64,
        value: String,
    },
    #[error("{path}: text has {lines} data lines but htslib read {records} records")]
    RecordCount {
        path: PathBuf,
        lines: usize,
        records: usize,
    },
    #[error("htslib error for {path}: {source}")]
    Htslib {
        path: PathBuf,
        #[source]
        source: rust_htslib::errors::Error,
    },
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn htslib(path: impl Into<PathBuf>, source: rust_htslib::errors::Error) -> Self {
        Error::Htslib {
            path: path.into(),
            source,
        }
    }
}
