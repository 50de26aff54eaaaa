//! Recovery of the Objective-C object model from compiled binaries.
//!
//! Compilers embed the Objective-C runtime metadata (classes, categories,
//! protocols, methods, properties, selectors, constant strings) into
//! well-known data sections of the output image. This crate walks those
//! sections according to the runtime's on-disk ABI and produces a typed,
//! cross-referenced graph ([`AnalysisInfo`]) that downstream consumers can
//! project onto a disassembler database or use to resolve message sends.
//!
//! The engine is a structural decoder only: it never executes code, and it
//! treats its input as hostile. Every entry in a section is decoded inside
//! its own failure boundary, so one malformed class or selector reference
//! cannot poison the rest of a run.
//!
//! ```no_run
//! use objlift::{analyze, ImageFile};
//!
//! let mut file = ImageFile::open("/path/to/binary")?;
//! let info = analyze(&mut file)?;
//! for class in &info.classes {
//!     println!("{}", class.referenced.name.referenced);
//! }
//! # Ok::<(), objlift::Error>(())
//! ```

/// ABI pointer-decoding rules (tagged pointers, fast-pointer flag bits)
pub mod abi;
/// Entity analyzers and the analysis provider
pub mod analysis;
/// Core data model: one record type per recovered entity
pub mod core;
/// Error types and causal-chain helpers
pub mod error;
/// Byte-level access to a loaded image
pub mod io;
/// Logging and tracing infrastructure
pub mod logging;

pub use crate::analysis::{analyze, analyze_into};
pub use crate::core::{Address, AnalysisInfo};
pub use crate::error::{Error, Result};
pub use crate::io::{AddressableFile, ImageFile, MemoryFile};
