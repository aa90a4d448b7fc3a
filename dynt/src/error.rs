//! Error taxonomy for the Type Engine.
//!
//! Every parse and accessor operation that can fail returns one of these
//! variants. Errors are never retried or partially recovered internally;
//! they surface to the caller unchanged.

use snafu::{Backtrace, Snafu};

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
#[non_exhaustive]
pub enum Error {
    /// Grammar violation, unterminated construct, or unresolved reference.
    #[snafu(display("parse error: {message}"))]
    Parse {
        message: String,
        backtrace: Backtrace,
    },

    /// Allocation failure while building a node, name, or value blob.
    #[snafu(display("memory error: {message}"))]
    Memory {
        message: String,
        backtrace: Backtrace,
    },

    /// An index or sequence position exceeded its declared capacity.
    #[snafu(display("index {index} out of range (capacity {cap})"))]
    OutOfRange {
        index: u32,
        cap: u32,
        backtrace: Backtrace,
    },

    /// A lookup by name found nothing.
    #[snafu(display("name '{name}' not found"))]
    NotFound { name: String },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        ParseSnafu {
            message: message.into(),
        }
        .build()
    }

    pub(crate) fn memory(message: impl Into<String>) -> Self {
        MemorySnafu {
            message: message.into(),
        }
        .build()
    }

    pub(crate) fn out_of_range(index: u32, cap: u32) -> Self {
        OutOfRangeSnafu { index, cap }.build()
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        NotFoundSnafu { name: name.into() }.build()
    }
}
