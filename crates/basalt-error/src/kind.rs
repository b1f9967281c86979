//! Diagnostic kinds raised by the analysis passes.

use strum_macros::{Display, IntoStaticStr};

/// Locality class of a diagnostic kind.
///
/// Name-resolution diagnostics do not prevent later nodes from resolving.
/// Type diagnostics leave the failing node's value-type slot empty; parent
/// handlers must tolerate that. Structural kinds originate in the parser,
/// never in the analysis core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagClass {
    NameResolution,
    Type,
    Structural,
}

/// The kind of diagnostic that occurred.
///
/// Matches the error vocabulary of the front-end so downstream tooling can
/// key off a stable tag rather than message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum DiagKind {
    // =========================================================================
    // Name resolution
    // =========================================================================
    /// A name use does not refer to any declared name
    UnkName,

    /// Two declarations share a name at the same module level
    DupName,

    /// A `_`-prefixed method or property was accessed from outside
    NotPublic,

    // =========================================================================
    // Type check / lowering
    // =========================================================================
    /// An expression's type does not satisfy what its context requires
    InvType,

    /// An expression that should carry a value type does not
    NotTyped,

    /// The receiver's type has no matching method or property
    NoMeth,

    /// Method/property syntax applied to a type that has neither
    BadMeth,

    /// Call arguments applied to a non-function value
    NotFn,

    /// More arguments than the declaration accepts
    ManyArgs,

    /// Fewer arguments than parameters without defaults
    FewArgs,

    /// A declaration carries neither a type nor an initial value
    NoInit,

    /// A default value that is invalid for its declaration
    BadImpl,
}

impl DiagKind {
    /// Returns the kind as a static string.
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Locality class, per the continue-on-error policy.
    pub fn class(&self) -> DiagClass {
        match self {
            DiagKind::UnkName | DiagKind::DupName | DiagKind::NotPublic => {
                DiagClass::NameResolution
            }
            _ => DiagClass::Type,
        }
    }
}
