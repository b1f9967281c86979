//! Interned name table with scope hooking.
//!
//! Every identifier the front-end sees is interned once; equal strings return
//! identical [`Name`] handles, so name comparison is symbol equality. Beside
//! the interner lives the *current binding* of each name: the declaration a
//! bare use of that name refers to right now.
//!
//! Bindings form the backbone of the scope stack through the hook protocol:
//! [`NameTable::hook`] rebinds a name and saves the previous binding in the
//! current frame; [`NameTable::pop_frame`] restores every saved binding in
//! reverse order. After any matched push/pop pair, every binding is exactly
//! what it was before the push. The parser hooks module-level declarations
//! eagerly (into the base frame) to detect duplicates; the name resolver
//! re-hooks per traversed scope.

use std::collections::HashMap;

use string_interner::StringInterner;
use string_interner::backend::DefaultBackend;
use string_interner::symbol::DefaultSymbol;

use crate::ir::DeclId;

/// Interned name handle. Identity is symbol equality.
pub type Name = DefaultSymbol;

#[derive(Debug)]
pub struct NameTable {
    interner: StringInterner<DefaultBackend>,
    /// Current binding of each name, if any.
    bindings: HashMap<Name, DeclId>,
    /// Hook frames. The first frame is permanent and holds the parser's
    /// eager module-level hooks; the rest bracket lexical scopes.
    frames: Vec<Vec<(Name, Option<DeclId>)>>,
    self_name: Name,
    call_name: Name,
}

impl NameTable {
    pub fn new() -> Self {
        let mut interner = StringInterner::new();
        let self_name = interner.get_or_intern("self");
        let call_name = interner.get_or_intern("()");
        Self {
            interner,
            bindings: HashMap::new(),
            frames: vec![Vec::new()],
            self_name,
            call_name,
        }
    }

    /// Intern a string; idempotent.
    #[inline]
    pub fn intern(&mut self, value: &str) -> Name {
        self.interner.get_or_intern(value)
    }

    /// Resolve a handle back to its character sequence.
    pub fn resolve(&self, name: Name) -> Option<&str> {
        self.interner.resolve(name)
    }

    /// Resolve a handle that is known to come from this table.
    pub fn as_str(&self, name: Name) -> &str {
        self.interner
            .resolve(name)
            .expect("name handle from a different table")
    }

    /// A name beginning with `_` is private to its declaring namespace.
    pub fn is_private(&self, name: Name) -> bool {
        self.as_str(name).starts_with('_')
    }

    /// The implicit receiver name `self`.
    #[inline]
    pub fn self_name(&self) -> Name {
        self.self_name
    }

    /// The implicit call operator, interned as `()`.
    #[inline]
    pub fn call_name(&self) -> Name {
        self.call_name
    }

    /// Current binding of a name, if any.
    #[inline]
    pub fn binding(&self, name: Name) -> Option<DeclId> {
        self.bindings.get(&name).copied()
    }

    /// Bind a name to a declaration, saving the previous binding in the
    /// current frame so the matching pop restores it.
    pub fn hook(&mut self, name: Name, decl: DeclId) {
        let prev = self.bindings.insert(name, decl);
        self.frames
            .last_mut()
            .expect("name table always has a base frame")
            .push((name, prev));
    }

    /// Open a new hook frame for a lexical scope.
    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Close the current frame, restoring every saved binding in reverse
    /// order. The base frame is never popped.
    pub fn pop_frame(&mut self) {
        debug_assert!(self.frames.len() > 1, "attempted to pop the base hook frame");
        if self.frames.len() <= 1 {
            return;
        }
        let frame = self.frames.pop().expect("frame count checked above");
        for (name, prev) in frame.into_iter().rev() {
            match prev {
                Some(decl) => {
                    self.bindings.insert(name, decl);
                }
                None => {
                    self.bindings.remove(&name);
                }
            }
        }
    }

    /// Number of frames above the base frame. Handlers assert this is
    /// unchanged across their own push/pop pairs.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut names = NameTable::new();
        let first = names.intern("point");
        let second = names.intern("point");
        assert_eq!(first, second);
        assert_ne!(first, names.intern("line"));
    }

    #[test]
    fn resolve_recovers_string() {
        let mut names = NameTable::new();
        let name = names.intern("velocity");
        assert_eq!(names.as_str(name), "velocity");
        assert_eq!(names.resolve(name), Some("velocity"));
    }

    #[test]
    fn private_names_start_with_underscore() {
        let mut names = NameTable::new();
        let hidden = names.intern("_hidden");
        let open = names.intern("open");
        assert!(names.is_private(hidden));
        assert!(!names.is_private(open));
    }

    #[test]
    fn hook_and_pop_restore_bindings() {
        let mut names = NameTable::new();
        let x = names.intern("x");
        let y = names.intern("y");

        names.hook(x, DeclId(1));
        assert_eq!(names.binding(x), Some(DeclId(1)));

        names.push_frame();
        names.hook(x, DeclId(2));
        names.hook(y, DeclId(3));
        assert_eq!(names.binding(x), Some(DeclId(2)));
        assert_eq!(names.binding(y), Some(DeclId(3)));

        names.pop_frame();
        assert_eq!(names.binding(x), Some(DeclId(1)));
        assert_eq!(names.binding(y), None);
    }

    #[test]
    fn nested_frames_restore_in_reverse_order() {
        let mut names = NameTable::new();
        let x = names.intern("x");

        names.push_frame();
        names.hook(x, DeclId(1));
        names.push_frame();
        names.hook(x, DeclId(2));
        names.hook(x, DeclId(3));
        assert_eq!(names.binding(x), Some(DeclId(3)));

        names.pop_frame();
        assert_eq!(names.binding(x), Some(DeclId(1)));
        names.pop_frame();
        assert_eq!(names.binding(x), None);
        assert_eq!(names.depth(), 0);
    }

    #[test]
    fn well_known_names_are_preinterned() {
        let mut names = NameTable::new();
        assert_eq!(names.intern("self"), names.self_name());
        assert_eq!(names.intern("()"), names.call_name());
    }
}
