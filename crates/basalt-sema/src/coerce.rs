//! The coercion relation, auto-ref/auto-deref and copy handling.
//!
//! Coercion is consulted in two modes: [`coerce_rank`] is a read-only query
//! used by overload scoring, and [`coerce`] is the committing form that
//! inserts at most one borrow or dereference node to adapt the expression.
//! A mismatch deeper than one level of reference is a type error, never a
//! double adjustment.

use basalt_core::arena::NodeArena;
use basalt_core::ir::{
    Alloc, Borrow, ExprId, ExprKind, ExprNode, ExprTag, Perm, PrimType, TypeId, TypeKind,
};

/// How a source type reaches a target type. `Exact` outranks every
/// conversion when overloads are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceRank {
    /// Types are equal after path resolution.
    Exact,
    /// Primitive widening within a numeric family (or int to float).
    Widen,
    /// Reference-to-reference permission/nullability subsumption.
    RefConvert,
    /// One implicit borrow.
    AutoRef,
    /// One implicit dereference.
    AutoDeref,
}

/// Numeric widening: within one family toward more bits, or any integer
/// into a float. Nothing widens to or from `bool`.
fn widens(from: PrimType, to: PrimType) -> bool {
    if from == to || from == PrimType::Bool || to == PrimType::Bool {
        return false;
    }
    if from.is_float() {
        return to.is_float() && from.width() < to.width();
    }
    if to.is_float() {
        return true;
    }
    if from.is_signed_int() {
        return to.is_signed_int() && from.width() < to.width();
    }
    to.is_unsigned_int() && from.width() < to.width()
}

/// A target permission accepts a source permission when they are equal,
/// when the target is `const` (reads through anything), or when the source
/// is `uni` (a unique reference may become anything).
fn perm_subsumes(to: Perm, from: Perm) -> bool {
    to == from || to == Perm::Const || from == Perm::Uni
}

/// Query whether `from` coerces to `to`, and at what rank.
pub fn coerce_rank(arena: &NodeArena, to: TypeId, from: TypeId) -> Option<CoerceRank> {
    let to_d = arena.type_dcl(to);
    let from_d = arena.type_dcl(from);
    if arena.types_equal(to_d, from_d) {
        return Some(CoerceRank::Exact);
    }
    match (&arena.ty(to_d).kind, &arena.ty(from_d).kind) {
        (TypeKind::Prim(tp), TypeKind::Prim(fp)) if widens(*fp, *tp) => Some(CoerceRank::Widen),
        (TypeKind::Ref(tr), TypeKind::Ref(fr)) => {
            let compatible = tr.array_ref == fr.array_ref
                && (tr.nullable || !fr.nullable)
                && arena.types_equal(tr.pvtype, fr.pvtype)
                && perm_subsumes(tr.perm, fr.perm);
            compatible.then_some(CoerceRank::RefConvert)
        }
        (TypeKind::Ref(tr), _) if !tr.array_ref && arena.types_equal(tr.pvtype, from_d) => {
            Some(CoerceRank::AutoRef)
        }
        (_, TypeKind::Ref(fr)) if arena.types_equal(to_d, fr.pvtype) => Some(CoerceRank::AutoDeref),
        (_, TypeKind::Ptr(fp)) if arena.types_equal(to_d, fp.pvtype) => Some(CoerceRank::AutoDeref),
        _ => None,
    }
}

/// Insert a single borrow node so `exp` is used as the reference type `to`.
pub fn auto_ref(arena: &mut NodeArena, exp: ExprId, to: TypeId) -> ExprId {
    let span = arena.expr(exp).span;
    let perm = match &arena.ty(arena.type_dcl(to)).kind {
        TypeKind::Ref(r) => r.perm,
        _ => Perm::Const,
    };
    arena.alloc_expr(ExprNode {
        span,
        vtype: Some(to),
        kind: ExprKind::Borrow(Borrow { exp, perm }),
    })
}

/// Insert a single dereference node if `exp` is a reference or pointer;
/// otherwise return it unchanged.
pub fn auto_deref(arena: &mut NodeArena, exp: ExprId) -> ExprId {
    let Some(ty) = arena.expr(exp).vtype else {
        return exp;
    };
    let pvtype = match &arena.ty(arena.type_dcl(ty)).kind {
        TypeKind::Ref(r) => r.pvtype,
        TypeKind::Ptr(p) => p.pvtype,
        _ => return exp,
    };
    let span = arena.expr(exp).span;
    arena.alloc_expr(ExprNode {
        span,
        vtype: Some(arena.type_dcl(pvtype)),
        kind: ExprKind::Deref { exp },
    })
}

/// Commit a coercion: returns the id to splice into the slot (possibly a
/// freshly inserted borrow/deref), or `None` when the types do not meet.
pub fn coerce(arena: &mut NodeArena, to: TypeId, exp: ExprId) -> Option<ExprId> {
    let from = arena.expr(exp).vtype?;
    match coerce_rank(arena, to, from)? {
        CoerceRank::Exact | CoerceRank::Widen | CoerceRank::RefConvert => Some(exp),
        CoerceRank::AutoRef => Some(auto_ref(arena, exp, to)),
        CoerceRank::AutoDeref => Some(auto_deref(arena, exp)),
    }
}

/// Whether values of a type copy freely rather than move.
fn is_copy_type(arena: &NodeArena, ty: TypeId) -> bool {
    match &arena.ty(arena.type_dcl(ty)).kind {
        TypeKind::Void | TypeKind::Prim(_) | TypeKind::FnSig(_) | TypeKind::Ptr(_) => true,
        TypeKind::Ref(r) => r.alloc != Alloc::Own && r.perm != Perm::Uni,
        TypeKind::Struct(_) | TypeKind::Array(_) | TypeKind::Tuple(_) | TypeKind::Path(_) => false,
    }
}

/// Temporaries may move into a parameter; lvalues may not.
fn is_move_capable(arena: &NodeArena, exp: ExprId) -> bool {
    !matches!(
        arena.expr(exp).tag(),
        ExprTag::NameUse | ExprTag::FieldAccess | ExprTag::Deref
    )
}

/// Copy handling for a finalized argument: owning values passed from an
/// lvalue are wrapped in an explicit copy node so the flow pass sees the
/// copy rather than a move-out.
pub fn handle_copy(arena: &mut NodeArena, exp: ExprId) -> ExprId {
    let Some(ty) = arena.expr(exp).vtype else {
        return exp;
    };
    if is_copy_type(arena, ty) || is_move_capable(arena, exp) {
        return exp;
    }
    let span = arena.expr(exp).span;
    arena.alloc_expr(ExprNode {
        span,
        vtype: Some(ty),
        kind: ExprKind::CopyVal { exp },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::ir::Span;

    fn lit(arena: &mut NodeArena, ty: TypeId) -> ExprId {
        arena.alloc_expr(ExprNode {
            span: Span::DUMMY,
            vtype: Some(ty),
            kind: ExprKind::ULit {
                value: 1,
                prim: PrimType::I32,
            },
        })
    }

    #[test]
    fn exact_outranks_widening() {
        let arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let i64_ty = arena.prims().i64;

        assert_eq!(coerce_rank(&arena, i32_ty, i32_ty), Some(CoerceRank::Exact));
        assert_eq!(coerce_rank(&arena, i64_ty, i32_ty), Some(CoerceRank::Widen));
        assert_eq!(coerce_rank(&arena, i32_ty, i64_ty), None);
    }

    #[test]
    fn bool_is_not_a_number() {
        let arena = NodeArena::new();
        let bool_ty = arena.prims().bool_;
        let i32_ty = arena.prims().i32;

        assert_eq!(coerce_rank(&arena, bool_ty, i32_ty), None);
        assert_eq!(coerce_rank(&arena, i32_ty, bool_ty), None);
        assert_eq!(
            coerce_rank(&arena, bool_ty, bool_ty),
            Some(CoerceRank::Exact)
        );
    }

    #[test]
    fn ints_widen_into_floats() {
        let arena = NodeArena::new();
        assert_eq!(
            coerce_rank(&arena, arena.prims().f64, arena.prims().u16),
            Some(CoerceRank::Widen)
        );
        assert_eq!(coerce_rank(&arena, arena.prims().u16, arena.prims().f64), None);
    }

    #[test]
    fn auto_ref_inserts_one_borrow() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let ref_ty = arena.ref_type(i32_ty, Perm::Imm);
        let exp = lit(&mut arena, i32_ty);

        assert_eq!(
            coerce_rank(&arena, ref_ty, i32_ty),
            Some(CoerceRank::AutoRef)
        );
        let adapted = coerce(&mut arena, ref_ty, exp).expect("coercible");
        assert_ne!(adapted, exp);
        assert_eq!(arena.expr(adapted).tag(), ExprTag::Borrow);
        assert_eq!(arena.expr(adapted).vtype, Some(ref_ty));
    }

    #[test]
    fn auto_deref_inserts_one_deref() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let ref_ty = arena.ref_type(i32_ty, Perm::Imm);
        let exp = lit(&mut arena, ref_ty);

        let adapted = coerce(&mut arena, i32_ty, exp).expect("coercible");
        assert_eq!(arena.expr(adapted).tag(), ExprTag::Deref);
        assert_eq!(arena.expr(adapted).vtype, Some(i32_ty));
    }

    #[test]
    fn double_level_mismatch_is_an_error() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let ref_ty = arena.ref_type(i32_ty, Perm::Imm);
        let ref_ref_ty = arena.ref_type(ref_ty, Perm::Imm);

        // &&i32 never coerces straight to i32.
        assert_eq!(coerce_rank(&arena, i32_ty, ref_ref_ty), None);
    }

    #[test]
    fn const_target_accepts_any_permission() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let const_ref = arena.ref_type(i32_ty, Perm::Const);
        let mut_ref = arena.ref_type(i32_ty, Perm::Mut);
        let imm_ref = arena.ref_type(i32_ty, Perm::Imm);

        assert_eq!(
            coerce_rank(&arena, const_ref, mut_ref),
            Some(CoerceRank::RefConvert)
        );
        assert_eq!(coerce_rank(&arena, mut_ref, imm_ref), None);
    }

    #[test]
    fn uni_source_converts_to_anything() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let uni_ref = arena.ref_type(i32_ty, Perm::Uni);
        let mut_ref = arena.ref_type(i32_ty, Perm::Mut);

        assert_eq!(
            coerce_rank(&arena, mut_ref, uni_ref),
            Some(CoerceRank::RefConvert)
        );
    }

    #[test]
    fn copy_handling_wraps_owning_lvalues() {
        let mut arena = NodeArena::new();
        let mut names = basalt_core::NameTable::new();
        let mut diags = basalt_core::Reporter::new();
        let mut b = basalt_core::IrBuilder::new(&mut arena, &mut names, &mut diags);

        let point = b.struct_decl("Point");
        let point_ty = b.arena.decl(point).vtype.unwrap();
        let p = b.name_use("p");
        drop(b);
        arena.expr_mut(p).vtype = Some(point_ty);

        let wrapped = handle_copy(&mut arena, p);
        assert_ne!(wrapped, p);
        assert_eq!(arena.expr(wrapped).tag(), ExprTag::CopyVal);

        // A primitive lvalue copies implicitly; no wrapper.
        let i32_ty = arena.prims().i32;
        let n = arena.alloc_expr(ExprNode {
            span: Span::DUMMY,
            vtype: Some(i32_ty),
            kind: ExprKind::ULit {
                value: 3,
                prim: PrimType::I32,
            },
        });
        assert_eq!(handle_copy(&mut arena, n), n);
    }
}
