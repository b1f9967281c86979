//! Best-match selection over a method overload chain.

use basalt_core::arena::NodeArena;
use basalt_core::ir::{DeclId, ExprId};

use crate::coerce::{CoerceRank, coerce_rank};

/// Score one candidate against the argument types, or `None` if it cannot
/// accept them. Exact positions count double so a fully exact signature
/// beats one reached through widening or auto-ref/deref.
fn score_candidate(arena: &NodeArena, candidate: DeclId, args: &[ExprId]) -> Option<u32> {
    let sig_ty = arena.decl(candidate).vtype?;
    let sig = arena.ty(arena.type_dcl(sig_ty)).as_fn_sig()?;

    // Arity is judged before default-argument expansion.
    if sig.parms.len() != args.len() {
        return None;
    }

    let mut score = 0;
    for (parm, arg) in sig.parms.iter().zip(args) {
        let parm_ty = arena.decl(*parm).vtype?;
        let arg_ty = arena.expr(*arg).vtype?;
        match coerce_rank(arena, parm_ty, arg_ty)? {
            CoerceRank::Exact => score += 2,
            _ => score += 1,
        }
    }
    Some(score)
}

/// Walk the overload chain starting at `first` and pick the best-scoring
/// candidate. Ties go to the earliest declaration, so the result is
/// deterministic for a given chain and argument type tuple.
pub fn best_match(arena: &NodeArena, first: DeclId, args: &[ExprId]) -> Option<DeclId> {
    let mut best: Option<(DeclId, u32)> = None;
    for candidate in arena.overload_chain(first) {
        let Some(score) = score_candidate(arena, candidate, args) else {
            continue;
        };
        if best.map_or(true, |(_, prev)| score > prev) {
            best = Some((candidate, score));
        }
    }
    best.map(|(decl, _)| decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::ir::{ExprKind, ExprNode, PrimType, Span, TypeId};
    use basalt_core::{IrBuilder, NameTable, Reporter};

    struct Fixture {
        arena: NodeArena,
        names: NameTable,
        diags: Reporter,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: NodeArena::new(),
                names: NameTable::new(),
                diags: Reporter::new(),
            }
        }

        fn builder(&mut self) -> IrBuilder<'_> {
            IrBuilder::new(&mut self.arena, &mut self.names, &mut self.diags)
        }

        fn typed_arg(&mut self, ty: TypeId) -> ExprId {
            self.arena.alloc_expr(ExprNode {
                span: Span::DUMMY,
                vtype: Some(ty),
                kind: ExprKind::ULit {
                    value: 0,
                    prim: PrimType::I32,
                },
            })
        }
    }

    /// Build `struct P { fn g(n i32) i32; fn g(x f64) i32 }` and return
    /// (struct, first overload, second overload).
    fn overloaded_struct(fx: &mut Fixture) -> (basalt_core::DeclId, basalt_core::DeclId, basalt_core::DeclId) {
        let mut b = fx.builder();
        let p = b.struct_decl("P");
        let i32_ty = b.arena.prims().i32;
        let f64_ty = b.arena.prims().f64;

        let n = b.param("n", i32_ty, None);
        let sig1 = b.method_sig(p, vec![n], i32_ty);
        let g1 = b.fn_decl("g", sig1, None);
        b.struct_add_method(p, g1);

        let x = b.param("x", f64_ty, None);
        let sig2 = b.method_sig(p, vec![x], i32_ty);
        let g2 = b.fn_decl("g", sig2, None);
        b.struct_add_method(p, g2);

        (p, g1, g2)
    }

    #[test]
    fn exact_parameter_wins_over_widening() {
        let mut fx = Fixture::new();
        let (p, g1, g2) = overloaded_struct(&mut fx);

        let p_ty = fx.arena.decl(p).vtype.unwrap();
        let recv = fx.typed_arg(p_ty);
        let i32_arg = fx.typed_arg(fx.arena.prims().i32);
        let f64_arg = fx.typed_arg(fx.arena.prims().f64);

        let g = fx.names.intern("g");
        let first = fx.arena.find_methprop(p, g).unwrap();

        assert_eq!(best_match(&fx.arena, first, &[recv, i32_arg]), Some(g1));
        assert_eq!(best_match(&fx.arena, first, &[recv, f64_arg]), Some(g2));
    }

    #[test]
    fn selection_is_deterministic() {
        let mut fx = Fixture::new();
        let (p, g1, _) = overloaded_struct(&mut fx);

        let p_ty = fx.arena.decl(p).vtype.unwrap();
        let g = fx.names.intern("g");
        let first = fx.arena.find_methprop(p, g).unwrap();

        for _ in 0..8 {
            let recv = fx.typed_arg(p_ty);
            let arg = fx.typed_arg(fx.arena.prims().i32);
            assert_eq!(best_match(&fx.arena, first, &[recv, arg]), Some(g1));
        }
    }

    #[test]
    fn ties_resolve_to_declaration_order() {
        let mut fx = Fixture::new();
        // Two overloads that both accept (P, i64) only through widening.
        let mut b = fx.builder();
        let p = b.struct_decl("P");
        let i32_ty = b.arena.prims().i32;
        let i64_ty = b.arena.prims().i64;

        let a = b.param("a", i64_ty, None);
        let sig1 = b.method_sig(p, vec![a], i32_ty);
        let h1 = b.fn_decl("h", sig1, None);
        b.struct_add_method(p, h1);

        let bp = b.param("b", i64_ty, None);
        let sig2 = b.method_sig(p, vec![bp], i32_ty);
        let h2 = b.fn_decl("h", sig2, None);
        b.struct_add_method(p, h2);

        let p_ty = fx.arena.decl(p).vtype.unwrap();
        let recv = fx.typed_arg(p_ty);
        let arg = fx.typed_arg(fx.arena.prims().i16);

        let h = fx.names.intern("h");
        let first = fx.arena.find_methprop(p, h).unwrap();
        assert_eq!(best_match(&fx.arena, first, &[recv, arg]), Some(h1));
    }

    #[test]
    fn arity_mismatch_rules_a_candidate_out() {
        let mut fx = Fixture::new();
        let (p, _, _) = overloaded_struct(&mut fx);

        let p_ty = fx.arena.decl(p).vtype.unwrap();
        let recv = fx.typed_arg(p_ty);

        let g = fx.names.intern("g");
        let first = fx.arena.find_methprop(p, g).unwrap();
        // Receiver only: both overloads want a second argument.
        assert_eq!(best_match(&fx.arena, first, &[recv]), None);
    }

    #[test]
    fn untyped_argument_matches_nothing() {
        let mut fx = Fixture::new();
        let (p, _, _) = overloaded_struct(&mut fx);

        let p_ty = fx.arena.decl(p).vtype.unwrap();
        let recv = fx.typed_arg(p_ty);
        let untyped = fx.arena.alloc_expr(ExprNode {
            span: Span::DUMMY,
            vtype: None,
            kind: ExprKind::ULit {
                value: 0,
                prim: PrimType::I32,
            },
        });

        let g = fx.names.intern("g");
        let first = fx.arena.find_methprop(p, g).unwrap();
        assert_eq!(best_match(&fx.arena, first, &[recv, untyped]), None);
    }
}
