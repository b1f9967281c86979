//! # basalt-error
//!
//! Diagnostic handling for the basalt analysis passes.
//!
//! ## Design Philosophy
//!
//! - **DiagKind**: know what went wrong (e.g. `UnkName`, `NoMeth`)
//! - **Locality**: name-resolution kinds never stop traversal; type kinds
//!   leave the failing node untyped but let siblings continue
//! - **Reporter**: a write-only sink that records and counts; passes never
//!   propagate diagnostics as `Result`
//!
//! A nonzero error count after a pass cancels the following passes and code
//! generation; the reporter is where that count lives.

mod kind;
mod report;

pub use kind::{DiagClass, DiagKind};
pub use report::{Diagnostic, Reporter, Span};
