//! # basalt-sema
//!
//! The semantic analysis core of the Basalt front-end. Two passes run over
//! the parsed IR, in order:
//!
//! 1. **Name resolution** binds every identifier use to its declaration,
//!    injects implicit `self` receivers, and rewrites bare member uses into
//!    receiver-qualified form.
//! 2. **Type check / lowering** fills every value-type slot, lowers method,
//!    operator and property syntax into direct calls and field accesses,
//!    coerces and copies arguments, expands defaults, and validates
//!    permissions.
//!
//! After a clean run every expression carries a type, every name use points
//! at its declaration, and the tree is ready for code generation without
//! further inference. A nonzero error count after either pass cancels the
//! rest of the pipeline.

pub mod coerce;
pub mod driver;
pub mod nameres;
pub mod overload;
pub mod typecheck;

pub use coerce::{CoerceRank, auto_deref, auto_ref, coerce, coerce_rank, handle_copy};
pub use driver::{AnalysisOptions, analyze, analyze_with};
pub use nameres::NameResolver;
pub use overload::best_match;
pub use typecheck::TypeChecker;
