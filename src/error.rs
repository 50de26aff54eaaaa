//! Error types for structure recovery.
//!
//! Failures during analysis carry their full causal chain: an analyzer
//! failure wraps the positioned read that caused it, which wraps the
//! underlying out-of-bounds or I/O condition. [`log_chain`] walks the chain
//! for diagnostic logging so a skipped entry can be traced back to the exact
//! read that failed.

use thiserror::Error;
use tracing::debug;

use crate::core::Address;

/// Main error type for structure-recovery operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A positioned read failed; wraps the underlying cause.
    #[error("{op}({addr:#x}) failed")]
    Read {
        op: &'static str,
        addr: Address,
        #[source]
        source: Box<Error>,
    },

    /// A read fell outside the bytes backing the file.
    #[error("read of {size} bytes at {addr:#x} is out of bounds")]
    OutOfBounds { addr: Address, size: u64 },

    /// An address is not covered by any loaded section.
    #[error("address {addr:#x} is not mapped by any section")]
    Unmapped { addr: Address },

    /// A method or property list header declares entries of zero size.
    ///
    /// Iterating such a list would never advance past its first entry, so
    /// the whole list is rejected as malformed.
    #[error("list at {addr:#x} declares a zero entry size")]
    ZeroEntsize { addr: Address },

    /// An analyzer failed in its section-iteration scaffolding.
    #[error("{analyzer} analyzer failed")]
    Analyzer {
        analyzer: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The input could not be parsed as a supported image format.
    #[error("unsupported image: {0}")]
    Image(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for structure-recovery operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a failure in the context of the named positioned read.
    pub(crate) fn read(op: &'static str, addr: Address, source: Error) -> Self {
        Error::Read {
            op,
            addr,
            source: Box::new(source),
        }
    }

    /// Wrap a failure in the context of the named analyzer.
    pub(crate) fn in_analyzer(self, analyzer: &'static str) -> Self {
        Error::Analyzer {
            analyzer,
            source: Box::new(self),
        }
    }

    /// Iterate the causal chain, outermost context first.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        std::iter::successors(
            Some(self as &(dyn std::error::Error + 'static)),
            |err| err.source(),
        )
    }
}

/// Emit one `debug!` line per level of an error's causal chain.
pub fn log_chain(err: &Error) {
    for (level, cause) in err.chain().enumerate() {
        debug!("{:indent$}{}", "", cause, indent = level * 2);
    }
}
