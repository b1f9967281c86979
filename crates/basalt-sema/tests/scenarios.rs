//! End-to-end analysis scenarios, driven through the parser-facing builder.

use basalt_core::ir::{ExprKind, ExprTag, NameUseForm, Perm, PrimType};
use basalt_core::{DeclId, DiagKind, ExprId, IrBuilder, NameTable, NodeArena, Reporter};
use basalt_sema::analyze;
use pretty_assertions::assert_eq;

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

    fn analyze(&mut self, root: DeclId) -> bool {
        analyze(&mut self.arena, &mut self.names, &mut self.diags, root)
    }

    /// The statements of a function's block body.
    fn body_stmts(&self, f: DeclId) -> Vec<ExprId> {
        let body = self.arena.decl(f).expect_fn().body.expect("body present");
        self.arena.expr(body).as_block().expect("block body").stmts.clone()
    }

    fn lit_value(&self, exp: ExprId) -> u64 {
        match self.arena.expr(exp).kind {
            ExprKind::ULit { value, .. } => value,
            _ => panic!("expected an integer literal"),
        }
    }

    /// Unwrap an inserted copy node, if any.
    fn skip_copy(&self, exp: ExprId) -> ExprId {
        match self.arena.expr(exp).kind {
            ExprKind::CopyVal { exp } => exp,
            _ => exp,
        }
    }
}

/// Scenario: `struct P { x i32; fn f() i32 { x } }`. The bare `x` becomes
/// `self.x` during resolution and a typed property access after check.
#[test]
fn implicit_self_property_access() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let x = b.var_decl("x", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(point, x);

    let use_x = b.name_use("x");
    let body = b.block(vec![use_x]);
    let sig = b.method_sig(point, vec![], i32_ty);
    let f = b.fn_decl("f", sig, Some(body));
    b.struct_add_method(point, f);
    b.struct_finish(point);
    b.module_add(root, point);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    let stmt = fx.body_stmts(f)[0];
    let access = fx.arena.expr(stmt);
    assert_eq!(access.tag(), ExprTag::FieldAccess);
    assert_eq!(access.vtype, Some(i32_ty));

    let field = access.as_field_access().unwrap();
    assert_eq!(field.member, use_x);
    let member = fx.arena.expr(use_x).expect_name_use();
    assert_eq!(member.form, NameUseForm::Member);
    assert_eq!(member.decl, Some(x));
    assert_eq!(fx.arena.expr(use_x).vtype, Some(i32_ty));

    let self_use = fx.arena.expr(field.obj).expect_name_use();
    assert_eq!(fx.names.as_str(self_use.name), "self");
}

/// Scenario: overloaded methods select by argument type, and the call node
/// ends up pointing straight at the chosen declaration with the receiver as
/// argument 0.
#[test]
fn method_overloads_select_by_argument_type() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let f64_ty = b.arena.prims().f64;
    let p_ty = b.arena.decl(point).vtype.unwrap();

    let n = b.param("n", i32_ty, None);
    let sig1 = b.method_sig(point, vec![n], i32_ty);
    let g1 = b.fn_decl("g", sig1, None);
    b.struct_add_method(point, g1);

    let s = b.param("s", f64_ty, None);
    let sig2 = b.method_sig(point, vec![s], i32_ty);
    let g2 = b.fn_decl("g", sig2, None);
    b.struct_add_method(point, g2);
    b.struct_finish(point);
    b.module_add(root, point);

    let p = b.param("p", p_ty, None);
    let p_use1 = b.name_use("p");
    let one = b.ulit(1, PrimType::I32);
    let call1 = b.method_call(p_use1, "g", Some(vec![one]));
    let p_use2 = b.name_use("p");
    let half = b.flit(0.5, PrimType::F64);
    let call2 = b.method_call(p_use2, "g", Some(vec![half]));
    let body = b.block(vec![call1, call2]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![p], void);
    let test_fn = b.fn_decl("test", sig, Some(body));
    b.module_add(root, test_fn);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    for (call, expected) in [(call1, g1), (call2, g2)] {
        let node = fx.arena.expr(call).expect_fn_call();
        assert!(node.methprop.is_none());
        let target = fx.arena.expr(node.objfn).expect_name_use();
        assert_eq!(target.decl, Some(expected));
        assert_eq!(target.form, NameUseForm::Var);

        let args = node.args.as_ref().unwrap();
        assert_eq!(args.len(), 2);
        let receiver = fx.skip_copy(args[0]);
        let receiver = fx.arena.expr(receiver).expect_name_use();
        assert_eq!(receiver.decl, Some(p));
        assert_eq!(fx.arena.expr(call).vtype, Some(i32_ty));
    }
}

/// Scenario: `fn h(a i32, b i32 = 7) i32` called as `h(1)` finalizes to the
/// argument list `[1, 7]` with the default deep-copied, and call type i32.
#[test]
fn default_argument_fills_the_call() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let a = b.param("a", i32_ty, None);
    let seven = b.ulit(7, PrimType::I32);
    let bp = b.param("b", i32_ty, Some(seven));
    let sig = b.fn_sig(vec![a, bp], i32_ty);
    let h = b.fn_decl("h", sig, None);
    b.module_add(root, h);

    let h_use = b.name_use("h");
    let one = b.ulit(1, PrimType::I32);
    let call = b.fn_call(h_use, Some(vec![one]));
    let body = b.block(vec![call]);
    let caller_sig = b.fn_sig(vec![], i32_ty);
    let caller = b.fn_decl("caller", caller_sig, Some(body));
    b.module_add(root, caller);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    let node = fx.arena.expr(call).expect_fn_call();
    let args = node.args.as_ref().unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(fx.lit_value(args[0]), 1);
    assert_eq!(fx.lit_value(args[1]), 7);
    // The default was copied, not shared with the declaration.
    assert_ne!(args[1], seven);
    assert_eq!(fx.arena.expr(call).vtype, Some(i32_ty));
}

/// Default round-trip: with several trailing defaults, finalization appends
/// them in declaration order after the supplied arguments.
#[test]
fn trailing_defaults_append_in_order() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let a = b.param("a", i32_ty, None);
    let seven = b.ulit(7, PrimType::I32);
    let bp = b.param("b", i32_ty, Some(seven));
    let nine = b.ulit(9, PrimType::I32);
    let c = b.param("c", i32_ty, Some(nine));
    let sig = b.fn_sig(vec![a, bp, c], i32_ty);
    let h = b.fn_decl("h", sig, None);
    b.module_add(root, h);

    let h_use = b.name_use("h");
    let one = b.ulit(1, PrimType::I32);
    let call = b.fn_call(h_use, Some(vec![one]));
    let body = b.block(vec![call]);
    let void = b.arena.prims().void;
    let caller_sig = b.fn_sig(vec![], void);
    let caller = b.fn_decl("caller", caller_sig, Some(body));
    b.module_add(root, caller);

    assert!(fx.analyze(root));
    let args = fx.arena.expr(call).expect_fn_call().args.clone().unwrap();
    let values: Vec<u64> = args.iter().map(|a| fx.lit_value(*a)).collect();
    assert_eq!(values, vec![1, 7, 9]);
}

/// Scenario: `a + b` is a call with methprop `+`; it lowers to a direct
/// call of the operator method with both operands as arguments.
#[test]
fn operator_call_lowers_to_method() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let vec2 = b.struct_decl("V");
    let f64_ty = b.arena.prims().f64;
    let xp = b.var_decl("x", Perm::Mut, Some(f64_ty), None);
    b.struct_add_prop(vec2, xp);
    let v_ty = b.arena.decl(vec2).vtype.unwrap();
    let o = b.param("o", v_ty, None);
    let plus_sig = b.method_sig(vec2, vec![o], f64_ty);
    let plus = b.fn_decl("+", plus_sig, None);
    b.struct_add_method(vec2, plus);
    b.struct_finish(vec2);
    b.module_add(root, vec2);

    let a = b.param("a", v_ty, None);
    let bv = b.param("b", v_ty, None);
    let a_use = b.name_use("a");
    let b_use = b.name_use("b");
    let sum = b.op_call(a_use, "+", vec![b_use]);
    let body = b.block(vec![sum]);
    let sig = b.fn_sig(vec![a, bv], f64_ty);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    let node = fx.arena.expr(sum).expect_fn_call();
    assert!(node.methprop.is_none());
    let target = fx.arena.expr(node.objfn).expect_name_use();
    assert_eq!(target.decl, Some(plus));

    let args = node.args.as_ref().unwrap();
    assert_eq!(args.len(), 2);
    let lhs = fx.arena.expr(fx.skip_copy(args[0])).expect_name_use();
    let rhs = fx.arena.expr(fx.skip_copy(args[1])).expect_name_use();
    assert_eq!(lhs.decl, Some(a));
    assert_eq!(rhs.decl, Some(bv));
    assert_eq!(fx.arena.expr(sum).vtype, Some(f64_ty));
}

/// Scenario: an operator on a type that lacks it raises `NoMeth`.
#[test]
fn missing_operator_raises_no_meth() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let w = b.struct_decl("W");
    let i32_ty = b.arena.prims().i32;
    let prop = b.var_decl("n", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(w, prop);
    b.struct_finish(w);
    b.module_add(root, w);
    let w_ty = b.arena.decl(w).vtype.unwrap();

    let a = b.param("a", w_ty, None);
    let bv = b.param("b", w_ty, None);
    let a_use = b.name_use("a");
    let b_use = b.name_use("b");
    let sum = b.op_call(a_use, "+", vec![b_use]);
    let body = b.block(vec![sum]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![a, bv], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::NoMeth]);
    assert!(fx.arena.expr(sum).vtype.is_none());
}

/// Scenario: accessing `p._hidden` raises `NotPublic` and leaves the node
/// untyped.
#[test]
fn private_member_access_is_rejected() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let zero = b.ulit(0, PrimType::I32);
    let hidden = b.var_decl("_hidden", Perm::Mut, Some(i32_ty), Some(zero));
    b.struct_add_prop(point, hidden);
    b.struct_finish(point);
    b.module_add(root, point);
    let p_ty = b.arena.decl(point).vtype.unwrap();

    let p = b.param("p", p_ty, None);
    let p_use = b.name_use("p");
    let access = b.method_call(p_use, "_hidden", None);
    let body = b.block(vec![access]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![p], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::NotPublic]);
    assert!(fx.arena.expr(access).vtype.is_none());
}

/// Scenario: `while 1 { }` raises `InvType`; integers do not coerce to
/// boolean. A boolean condition is accepted.
#[test]
fn while_condition_must_be_boolean() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let one = b.ulit(1, PrimType::I32);
    let inner = b.block(vec![]);
    let bad_loop = b.while_loop(one, inner);

    let t = b.ulit(1, PrimType::Bool);
    let inner2 = b.block(vec![]);
    let good_loop = b.while_loop(t, inner2);

    let body = b.block(vec![bad_loop, good_loop]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::InvType]);
}

/// A method calling a sibling method by bare name gets the enclosing
/// receiver inserted as argument 0.
#[test]
fn sibling_method_call_inserts_self() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let prop = b.var_decl("x", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(point, prop);

    let one = b.ulit(1, PrimType::I32);
    let b_body = b.block(vec![one]);
    let b_sig = b.method_sig(point, vec![], i32_ty);
    let meth_b = b.fn_decl("b", b_sig, Some(b_body));
    b.struct_add_method(point, meth_b);

    let b_use = b.name_use("b");
    let call = b.fn_call(b_use, Some(vec![]));
    let a_body = b.block(vec![call]);
    let a_sig = b.method_sig(point, vec![], i32_ty);
    let meth_a = b.fn_decl("a", a_sig, Some(a_body));
    b.struct_add_method(point, meth_a);
    b.struct_finish(point);
    b.module_add(root, point);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    let node = fx.arena.expr(call).expect_fn_call();
    let args = node.args.as_ref().unwrap();
    assert_eq!(args.len(), 1);
    let receiver = fx.arena.expr(fx.skip_copy(args[0])).expect_name_use();
    assert_eq!(fx.names.as_str(receiver.name), "self");
    // Bound to a's own self parameter, not b's.
    let a_sig_ty = fx.arena.decl(meth_a).vtype.unwrap();
    let a_self = fx.arena.ty(a_sig_ty).expect_fn_sig().parms[0];
    assert_eq!(receiver.decl, Some(a_self));
}

/// Calling a method-typed value with no member name means the `()` call
/// operator.
#[test]
fn bare_call_uses_the_call_operator() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let counter = b.struct_decl("Counter");
    let i32_ty = b.arena.prims().i32;
    let prop = b.var_decl("n", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(counter, prop);
    let op_sig = b.method_sig(counter, vec![], i32_ty);
    let op = b.fn_decl("()", op_sig, None);
    b.struct_add_method(counter, op);
    b.struct_finish(counter);
    b.module_add(root, counter);
    let c_ty = b.arena.decl(counter).vtype.unwrap();

    let c = b.param("c", c_ty, None);
    let c_use = b.name_use("c");
    let call = b.fn_call(c_use, Some(vec![]));
    let body = b.block(vec![call]);
    let sig = b.fn_sig(vec![c], i32_ty);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    let node = fx.arena.expr(call).expect_fn_call();
    let target = fx.arena.expr(node.objfn).expect_name_use();
    assert_eq!(target.decl, Some(op));
    assert_eq!(fx.arena.expr(call).vtype, Some(i32_ty));
}

/// Too many and too few arguments report `ManyArgs` / `FewArgs` and leave
/// sibling statements checked.
#[test]
fn arity_errors_report_and_continue() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let a = b.param("a", i32_ty, None);
    let bp = b.param("b", i32_ty, None);
    let sig = b.fn_sig(vec![a, bp], i32_ty);
    let h = b.fn_decl("h", sig, None);
    b.module_add(root, h);

    let h1 = b.name_use("h");
    let args1: Vec<ExprId> = (0..3).map(|v| b.ulit(v, PrimType::I32)).collect();
    let too_many = b.fn_call(h1, Some(args1));
    let h2 = b.name_use("h");
    let one = b.ulit(1, PrimType::I32);
    let too_few = b.fn_call(h2, Some(vec![one]));
    let ok_lit = b.ulit(5, PrimType::I32);
    let body = b.block(vec![too_many, too_few, ok_lit]);
    let void = b.arena.prims().void;
    let caller_sig = b.fn_sig(vec![], void);
    let caller = b.fn_decl("caller", caller_sig, Some(body));
    b.module_add(root, caller);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::ManyArgs, DiagKind::FewArgs]);
    // The sibling literal was still checked.
    assert!(fx.arena.expr(ok_lit).vtype.is_some());
}

/// Method syntax on a non-method type raises `BadMeth`; applying arguments
/// to a non-function raises `NotFn`; an untyped callee raises `NotTyped`.
#[test]
fn call_misuse_kinds() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let n = b.param("n", i32_ty, None);

    let n1 = b.name_use("n");
    let bad_meth = b.method_call(n1, "foo", None);
    let n2 = b.name_use("n");
    let one = b.ulit(1, PrimType::I32);
    let not_fn = b.fn_call(n2, Some(vec![one]));
    // *5 is an InvType whose call leaves the callee untyped.
    let five = b.ulit(5, PrimType::I32);
    let bad_deref = b.deref(five);
    let not_typed = b.fn_call(bad_deref, Some(vec![]));

    let body = b.block(vec![bad_meth, not_fn, not_typed]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![n], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(
        fx.diags.kinds(),
        vec![
            DiagKind::BadMeth,
            DiagKind::NotFn,
            DiagKind::InvType,
            DiagKind::NotTyped
        ]
    );
}

/// A local declaration with neither type nor initializer raises `NoInit`.
#[test]
fn declaration_needs_type_or_value() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let v = b.var_decl("v", Perm::Imm, None, None);
    let stmt = b.decl_stmt(v);
    let body = b.block(vec![stmt]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::NoInit]);
}

/// A parameter default that cannot coerce to the parameter type raises
/// `BadImpl` at the declaration.
#[test]
fn bad_parameter_default_raises_bad_impl() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let bad = b.flit(0.5, PrimType::F64);
    let a = b.param("a", i32_ty, Some(bad));
    let sig = b.fn_sig(vec![a], i32_ty);
    let h = b.fn_decl("h", sig, None);
    b.module_add(root, h);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::BadImpl]);
}

/// Assignment checks mutability and value type; local inference takes the
/// initializer's type.
#[test]
fn assignment_and_inference() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;

    // mut v = 3; v = 4       (inferred i32, mutable: fine)
    let three = b.ulit(3, PrimType::I32);
    let v = b.var_decl("v", Perm::Mut, None, Some(three));
    let v_stmt = b.decl_stmt(v);
    let v_use = b.name_use("v");
    let four = b.ulit(4, PrimType::I32);
    let ok_assign = b.assign(v_use, four);

    // imm w i32 = 1; w = 2   (immutable target)
    let one = b.ulit(1, PrimType::I32);
    let w = b.var_decl("w", Perm::Imm, Some(i32_ty), Some(one));
    let w_stmt = b.decl_stmt(w);
    let w_use = b.name_use("w");
    let two = b.ulit(2, PrimType::I32);
    let bad_assign = b.assign(w_use, two);

    let body = b.block(vec![v_stmt, ok_assign, w_stmt, bad_assign]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![], void);
    let f = b.fn_decl("f", sig, Some(body));
    b.module_add(root, f);

    assert!(!fx.analyze(root));
    assert_eq!(fx.diags.kinds(), vec![DiagKind::InvType]);
    assert_eq!(fx.arena.decl(v).vtype, Some(i32_ty));
    assert_eq!(fx.arena.expr(ok_assign).vtype, Some(i32_ty));
}

/// Resolution and typing totality: after a clean analysis every name use
/// is bound with a classified form, and every expression node carries a
/// value type.
#[test]
fn totality_after_clean_analysis() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let x = b.var_decl("x", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(point, x);
    let use_x = b.name_use("x");
    let ret_body = b.block(vec![use_x]);
    let len_sig = b.method_sig(point, vec![], i32_ty);
    let len = b.fn_decl("len", len_sig, Some(ret_body));
    b.struct_add_method(point, len);
    b.struct_finish(point);
    b.module_add(root, point);

    let p_ty = b.arena.decl(point).vtype.unwrap();
    let p = b.param("p", p_ty, None);
    let p_use = b.name_use("p");
    let call = b.method_call(p_use, "len", None);
    let cond = b.ulit(1, PrimType::Bool);
    let loop_body = b.block(vec![call]);
    let lp = b.while_loop(cond, loop_body);
    let body = b.block(vec![lp]);
    let void = b.arena.prims().void;
    let sig = b.fn_sig(vec![p], void);
    let f = b.fn_decl("drive", sig, Some(body));
    b.module_add(root, f);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());

    for id in fx.arena.expr_ids() {
        let node = fx.arena.expr(id);
        assert!(
            node.vtype.is_some(),
            "expression {} ({}) has no value type",
            id,
            node.tag()
        );
        if let Some(nu) = node.as_name_use() {
            assert!(nu.decl.is_some(), "name use {} is unbound", id);
            assert_ne!(nu.form, NameUseForm::Unresolved);
        }
    }
}

/// Tuple returns check element-wise against the declared return types.
#[test]
fn tuple_return_checks_elementwise() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let i32_ty = b.arena.prims().i32;
    let f64_ty = b.arena.prims().f64;
    let pair = b.arena.tuple_type(vec![i32_ty, f64_ty]);

    let one = b.ulit(1, PrimType::I32);
    let half = b.flit(0.5, PrimType::F64);
    let ret = b.ret(vec![one, half]);
    let body = b.block(vec![ret]);
    let sig = b.fn_sig(vec![], pair);
    let f = b.fn_decl("pair", sig, Some(body));
    b.module_add(root, f);

    assert!(fx.analyze(root));
    assert!(fx.diags.is_clean());
}

/// The hook stack depth is unchanged across a full analysis of nested
/// modules, structs, functions and blocks.
#[test]
fn hook_stack_balances_end_to_end() {
    let mut fx = Fixture::new();
    let mut b = fx.builder();

    let root = b.module(None);
    let geo = b.module(Some("geo"));
    let point = b.struct_decl("P");
    let i32_ty = b.arena.prims().i32;
    let x = b.var_decl("x", Perm::Mut, Some(i32_ty), None);
    b.struct_add_prop(point, x);
    let use_x = b.name_use("x");
    let inner_block = b.block(vec![use_x]);
    let outer_block = b.block(vec![inner_block]);
    let m_sig = b.method_sig(point, vec![], i32_ty);
    let m = b.fn_decl("m", m_sig, Some(outer_block));
    b.struct_add_method(point, m);
    b.struct_finish(point);
    b.module_add(geo, point);
    b.module_add(root, geo);

    let depth = fx.names.depth();
    assert!(fx.analyze(root));
    assert_eq!(fx.names.depth(), depth);
}
