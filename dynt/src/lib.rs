//! Parses a compact textual type descriptor into a type tree usable for
//! FFI-compatible layout, allocation, and navigation of native values.
//!
//! ```
//! use dynt::{parse_string, ParseOptions};
//!
//! let tree = dynt::parse_string("I", &ParseOptions::new()).unwrap();
//! assert_eq!(tree.root().size(), 4);
//! ```

mod abi;
mod access;
mod error;
mod layout;
mod lexer;
mod logger;
mod node;
mod parser;
mod printer;

pub use abi::{AbiOracle, Layout, NativeAbi, Primitive, StructLayout};
pub use access::Value;
pub use error::{Error, Result};
pub use logger::{Level, Logger, NullLogger, TracingLogger};
pub use node::{Arena, Kind, NodeHandle, ReferenceScope};
pub use parser::{parse_stream, parse_string, ParseOptions};
pub use printer::print;

pub mod prelude {
    pub use crate::abi::{AbiOracle, Primitive};
    pub use crate::logger::{Level, Logger};
    pub use crate::node::{Kind, NodeHandle, ReferenceScope};
    pub use crate::parser::{parse_stream, parse_string, ParseOptions};
    pub use crate::Value;
}
