//! # basalt-core
//!
//! IR node model and pass plumbing for the Basalt front-end: the interned
//! name table with scope hooking, the arena-backed heterogeneous tree of
//! declarations / expressions / types, the parser-facing builder, the
//! visitor trait the passes drive, and the textual IR dump.

pub mod arena;
pub mod builder;
pub mod ir;
pub mod names;
pub mod printer;
pub mod visit;

pub use arena::{NodeArena, PrimTable};
pub use basalt_error::{DiagKind, Reporter, Span};
pub use builder::IrBuilder;
pub use ir::{DeclId, ExprId, TypeId};
pub use names::{Name, NameTable};
pub use visit::{IrVisitor, Pass, PassFlags, PassState};
