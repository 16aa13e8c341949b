//! Error taxonomy for the annealing engine.
//!
//! Mirrors the hand-rolled `RunnerError` pattern: a closed enum with a
//! manual `Display`/`Error` implementation and a crate-wide `Result`
//! alias, rather than a derive-macro-based error crate.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Errors raised by the annealing engine.
#[derive(Debug)]
pub enum CatmipError {
    /// A configuration value was missing, out of range, or internally
    /// inconsistent (e.g. parameter-set counts not summing to `parameters`).
    Config(String),
    /// An I/O failure while reading inputs or writing archiver/profiler
    /// output.
    Io(io::Error),
    /// A numerical-conditioning failure: a non-symmetric-positive-definite
    /// proposal covariance (Cholesky failed), or a non-positive data
    /// covariance determinant.
    NumericalConditioning(String),
    /// A distributed-communication failure (partition/collect/all-reduce
    /// disagreement, or a missing rank).
    Distributed(String),
}

impl fmt::Display for CatmipError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatmipError::Config(msg) => write!(f, "configuration error: {}", msg),
            CatmipError::Io(err) => write!(f, "I/O error: {}", err),
            CatmipError::NumericalConditioning(msg) => {
                write!(f, "numerical conditioning error: {}", msg)
            }
            CatmipError::Distributed(msg) => write!(f, "distributed communication error: {}", msg),
        }
    }
}

impl StdError for CatmipError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CatmipError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CatmipError {
    fn from(err: io::Error) -> Self {
        CatmipError::Io(err)
    }
}

impl From<csv::Error> for CatmipError {
    fn from(err: csv::Error) -> Self {
        CatmipError::Io(io::Error::new(io::ErrorKind::Other, err))
    }
}

#[cfg(feature = "serde_support")]
impl From<serde_json::Error> for CatmipError {
    fn from(err: serde_json::Error) -> Self {
        CatmipError::Io(io::Error::new(io::ErrorKind::Other, err))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CatmipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let err = CatmipError::Config("parameters must sum to P".to_string());
        assert_eq!(
            format!("{}", err),
            "configuration error: parameters must sum to P"
        );
    }

    #[test]
    fn io_error_has_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = CatmipError::from(io_err);
        assert!(StdError::source(&err).is_some());
    }
}
