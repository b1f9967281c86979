//! Type check and IR lowering pass.
//!
//! Visits children first, then resolves each node: value-type slots fill in,
//! method/operator/property syntax lowers into direct calls or field
//! accesses, arguments coerce (inserting at most one auto-ref or
//! auto-deref), owning arguments get copy handling, missing arguments pull
//! parameter defaults, and permissions are validated. Nodes that fail keep
//! an empty value-type slot; parents tolerate that and the pass continues.

use std::collections::HashSet;

use basalt_core::arena::NodeArena;
use basalt_core::ir::{
    DeclFlags, DeclId, DeclTag, ExprId, ExprKind, ExprNode, FieldAccess, NameUse, NameUseForm,
    TypeKind,
};
use basalt_core::names::NameTable;
use basalt_core::visit::{IrVisitor, Pass, PassFlags, PassState};
use basalt_core::{DiagKind, Reporter};

use crate::coerce::{auto_deref, coerce, handle_copy};
use crate::overload::best_match;

pub struct TypeChecker<'a> {
    arena: &'a mut NodeArena,
    names: &'a mut NameTable,
    diags: &'a mut Reporter,
    state: PassState,
    /// Declarations already checked; the module pre-pass and the full walk
    /// both reach signatures, and overload chains revisit members.
    done: HashSet<DeclId>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        arena: &'a mut NodeArena,
        names: &'a mut NameTable,
        diags: &'a mut Reporter,
        root: DeclId,
    ) -> Self {
        Self {
            arena,
            names,
            diags,
            state: PassState::new(Pass::TypeCheck, root),
            done: HashSet::new(),
        }
    }

    /// Run the pass over the root module.
    pub fn run(mut self) {
        let root = self.state.module;
        self.visit_decl(root);
    }

    // -----------------------------------------------------------------------
    // Call lowering
    // -----------------------------------------------------------------------

    /// Lower a call on a method-typed receiver into a property access or a
    /// direct function call.
    fn lower_method(&mut self, id: ExprId, objtype: basalt_core::TypeId) {
        let owner = self
            .arena
            .struct_of_type(objtype)
            .expect("caller established a method-typed receiver");
        let member = self
            .arena
            .expr(id)
            .expect_fn_call()
            .methprop
            .expect("caller filled in the member name");
        let methname = self.arena.expr(member).expect_name_use().name;

        if self.names.is_private(methname) {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::NotPublic,
                format!(
                    "may not access the private method or property {}",
                    self.names.as_str(methname)
                ),
            );
            return;
        }

        let found = self.arena.find_methprop(owner, methname);
        let found = match found {
            Some(found) if self.arena.decl(found).is_meth_prop() => found,
            _ => {
                let span = self.arena.expr(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::NoMeth,
                    format!(
                        "object's type has no method or property named {}",
                        self.names.as_str(methname)
                    ),
                );
                return;
            }
        };

        // A property: lower the call node to a field access.
        if self.arena.decl(found).tag() == DeclTag::Var {
            if self.arena.expr(id).expect_fn_call().args.is_some() {
                let span = self.arena.expr(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::ManyArgs,
                    "may not provide arguments for a property access",
                );
            }
            let obj = self.arena.expr(id).expect_fn_call().objfn;
            let obj = auto_deref(self.arena, obj);
            let prop_ty = self.arena.decl(found).vtype;
            {
                let m = self.arena.expr_mut(member);
                m.vtype = prop_ty;
                m.expect_name_use_mut().decl = Some(found);
            }
            let node = self.arena.expr_mut(id);
            node.vtype = prop_ty;
            node.kind = ExprKind::FieldAccess(FieldAccess { obj, member });
            return;
        }

        // A method: the receiver becomes argument 0 and the best overload
        // is selected against the full argument list.
        {
            let objfn = self.arena.expr(id).expect_fn_call().objfn;
            let call = self.arena.expr_mut(id).expect_fn_call_mut();
            match call.args.as_mut() {
                Some(args) => args.insert(0, objfn),
                None => call.args = Some(vec![objfn]),
            }
        }
        let args = self
            .arena
            .expr(id)
            .expect_fn_call()
            .args
            .clone()
            .expect("receiver inserted above");

        let Some(best) = best_match(self.arena, found, &args) else {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::NoMeth,
                format!(
                    "no method named {} matches the call's arguments",
                    self.names.as_str(methname)
                ),
            );
            return;
        };
        let best_sig = self
            .arena
            .decl(best)
            .vtype
            .expect("function declarations carry their signature");

        // Re-purpose the member name node as a reference to the selected
        // method and move it into the call's function position.
        {
            let m = self.arena.expr_mut(member);
            m.vtype = Some(best_sig);
            let nu = m.expect_name_use_mut();
            nu.decl = Some(best);
            nu.form = NameUseForm::Var;
        }
        let rettype = self
            .arena
            .ty(self.arena.type_dcl(best_sig))
            .expect_fn_sig()
            .rettype;
        {
            let call = self.arena.expr_mut(id).expect_fn_call_mut();
            call.objfn = member;
            call.methprop = None;
        }
        self.arena.expr_mut(id).vtype = Some(rettype);

        self.finalize_args(id, best_sig);
    }

    /// Verify argument types against the resolved signature, apply copy
    /// handling, and fill missing arguments from parameter defaults.
    fn finalize_args(&mut self, id: ExprId, sig_ty: basalt_core::TypeId) {
        let parms = self
            .arena
            .ty(self.arena.type_dcl(sig_ty))
            .expect_fn_sig()
            .parms
            .clone();
        let argc = self
            .arena
            .expr(id)
            .expect_fn_call()
            .args
            .as_ref()
            .map_or(0, |args| args.len());

        // Both list ends are guarded: supplied arguments past the parameter
        // list were rejected by the caller, and the zip below never reads
        // past either list.
        for index in 0..argc.min(parms.len()) {
            let Some(parm_ty) = self.arena.decl(parms[index]).vtype else {
                continue;
            };
            let arg = self.arena.expr(id).expect_fn_call().args.as_ref().expect("argc nonzero")
                [index];
            if self.arena.expr(arg).vtype.is_none() {
                continue;
            }
            match coerce(self.arena, parm_ty, arg) {
                Some(adapted) => {
                    let adapted = handle_copy(self.arena, adapted);
                    if adapted != arg {
                        self.arena
                            .expr_mut(id)
                            .expect_fn_call_mut()
                            .args
                            .as_mut()
                            .expect("argc nonzero")[index] = adapted;
                    }
                }
                None => {
                    let span = self.arena.expr(arg).span;
                    self.diags.error_node(
                        span,
                        DiagKind::InvType,
                        "expression's type does not match the declared parameter",
                    );
                }
            }
        }

        if argc < parms.len() {
            for parm in parms.iter().skip(argc) {
                match self.arena.decl(*parm).expect_var().value {
                    None => {
                        let span = self.arena.expr(id).span;
                        self.diags.error_node(
                            span,
                            DiagKind::FewArgs,
                            "function call requires more arguments than specified",
                        );
                        break;
                    }
                    Some(default) => {
                        // Each call site gets its own copy of the default
                        // expression; check it here if its declaration has
                        // not been reached yet.
                        let cloned = self.arena.clone_expr(default);
                        let cloned = if self.arena.expr(cloned).vtype.is_none() {
                            self.visit_expr(cloned)
                        } else {
                            cloned
                        };
                        self.arena
                            .expr_mut(id)
                            .expect_fn_call_mut()
                            .args
                            .as_mut()
                            .expect("ensured by callers")
                            .push(cloned);
                    }
                }
            }
        }
    }

    /// Whether an assignment target is immutable.
    fn immutable_lval(&self, lval: ExprId) -> bool {
        match &self.arena.expr(lval).kind {
            ExprKind::NameUse(nu) if nu.form == NameUseForm::Var => nu
                .decl
                .and_then(|d| self.arena.decl(d).as_var().map(|v| !v.perm.is_mutable()))
                .unwrap_or(false),
            ExprKind::FieldAccess(f) => {
                let member = self.arena.expr(f.member);
                member
                    .as_name_use()
                    .and_then(|nu| nu.decl)
                    .and_then(|d| self.arena.decl(d).as_var().map(|v| !v.perm.is_mutable()))
                    .unwrap_or(false)
            }
            ExprKind::Deref { exp } => {
                let Some(ty) = self.arena.expr(*exp).vtype else {
                    return false;
                };
                match &self.arena.ty(self.arena.type_dcl(ty)).kind {
                    TypeKind::Ref(r) => !r.perm.is_mutable(),
                    TypeKind::Ptr(p) => !p.perm.is_mutable(),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl<'a> IrVisitor for TypeChecker<'a> {
    fn arena(&mut self) -> &mut NodeArena {
        &mut *self.arena
    }

    fn state(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn visit_ulit(&mut self, id: ExprId) -> ExprId {
        let prim = match self.arena.expr(id).kind {
            ExprKind::ULit { prim, .. } => prim,
            _ => unreachable!("ulit dispatch"),
        };
        let ty = self.arena.prim(prim);
        self.arena.expr_mut(id).vtype = Some(ty);
        id
    }

    fn visit_flit(&mut self, id: ExprId) -> ExprId {
        let prim = match self.arena.expr(id).kind {
            ExprKind::FLit { prim, .. } => prim,
            _ => unreachable!("flit dispatch"),
        };
        let ty = self.arena.prim(prim);
        self.arena.expr_mut(id).vtype = Some(ty);
        id
    }

    fn visit_name_use(&mut self, id: ExprId) -> ExprId {
        let (form, decl) = {
            let nu = self.arena.expr(id).expect_name_use();
            (nu.form, nu.decl)
        };
        // Value and type names copy their declaration's type. A type name
        // used as a value then lowers through the `()` call operator like
        // any other method-typed receiver. Member names are typed by call
        // lowering instead.
        if matches!(form, NameUseForm::Var | NameUseForm::Type) {
            if let Some(decl) = decl {
                if let Some(vtype) = self.arena.decl(decl).vtype {
                    self.arena.expr_mut(id).vtype = Some(vtype);
                }
            }
        }
        id
    }

    fn visit_var_decl(&mut self, id: DeclId) {
        if !self.done.insert(id) {
            return;
        }

        if let Some(vtype) = self.arena.decl(id).vtype {
            self.visit_type(vtype);
        }

        let flags = self.arena.decl(id).flags;
        let perm = self.arena.decl(id).expect_var().perm;
        if !perm.is_declarable(flags.contains(DeclFlags::MAY_CONST)) {
            let span = self.arena.decl(id).span;
            self.diags.error_node(
                span,
                DiagKind::InvType,
                format!("permission {} is not valid for a variable or property declaration", perm),
            );
        }

        let value = self.arena.decl(id).expect_var().value;
        let Some(value) = value else {
            if self.arena.decl(id).vtype.is_none() && !flags.contains(DeclFlags::PARM) {
                let span = self.arena.decl(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::NoInit,
                    "declaration must specify a type or an initial value",
                );
            }
            return;
        };

        let visited = self.visit_expr(value);
        if visited != value {
            self.arena.decl_mut(id).expect_var_mut().value = Some(visited);
        }

        match self.arena.decl(id).vtype {
            Some(declared) => {
                if self.arena.expr(visited).vtype.is_none() {
                    return;
                }
                match coerce(self.arena, declared, visited) {
                    Some(adapted) => {
                        if adapted != visited {
                            self.arena.decl_mut(id).expect_var_mut().value = Some(adapted);
                        }
                    }
                    None => {
                        let span = self.arena.expr(visited).span;
                        if flags.contains(DeclFlags::PARM) {
                            self.diags.error_node(
                                span,
                                DiagKind::BadImpl,
                                "default value does not match the parameter's declared type",
                            );
                        } else {
                            self.diags.error_node(
                                span,
                                DiagKind::InvType,
                                "initializer's type does not match the declared type",
                            );
                        }
                    }
                }
            }
            None => {
                // Infer the variable's type from its initializer.
                let inferred = self.arena.expr(visited).vtype;
                self.arena.decl_mut(id).vtype = inferred;
            }
        }
    }

    fn visit_fn_decl(&mut self, id: DeclId) {
        if !self.done.insert(id) {
            return;
        }
        let saved_fnsig = self.state.fnsig;
        let sig = self.arena.decl(id).vtype;
        self.state.fnsig = sig;

        if let Some(sig) = sig {
            self.visit_type(sig);
        }

        let body = self.arena.decl(id).expect_fn().body;
        if let Some(body) = body {
            let new = self.visit_expr(body);
            if new != body {
                self.arena.decl_mut(id).expect_fn_mut().body = Some(new);
            }
        }

        self.state.fnsig = saved_fnsig;
    }

    fn visit_module(&mut self, id: DeclId) {
        let saved_module = self.state.module;
        self.state.module = id;

        // Types of globals and signatures first, so calls and uses that
        // appear before a declaration still see a typed target.
        let nodes = self.arena.decl(id).expect_module().nodes.clone();
        for node in &nodes {
            match self.arena.decl(*node).tag() {
                DeclTag::Var | DeclTag::Fn => {
                    if let Some(vtype) = self.arena.decl(*node).vtype {
                        self.visit_type(vtype);
                    }
                }
                _ => {}
            }
        }

        for node in nodes {
            self.visit_decl(node);
        }

        self.state.module = saved_module;
    }

    fn visit_fn_call(&mut self, id: ExprId) -> ExprId {
        self.walk_fn_call(id);

        let objfn = self.arena.expr(id).expect_fn_call().objfn;
        let Some(obj_ty) = self.arena.expr(objfn).vtype else {
            let span = self.arena.expr(objfn).span;
            self.diags
                .error_node(span, DiagKind::NotTyped, "expecting a typed expression");
            return id;
        };
        let objtype = self.arena.deref_type(obj_ty);

        // Method-typed receivers lower through member lookup; a bare call
        // on such a value means the `()` call operator.
        if self.arena.is_method_type(objtype) {
            if self.arena.expr(id).expect_fn_call().methprop.is_none() {
                let span = self.arena.expr(id).span;
                let call_name = self.names.call_name();
                let member = self.arena.alloc_expr(ExprNode {
                    span,
                    vtype: None,
                    kind: ExprKind::NameUse(NameUse {
                        name: call_name,
                        quals: None,
                        decl: None,
                        form: NameUseForm::Member,
                    }),
                });
                self.arena.expr_mut(id).expect_fn_call_mut().methprop = Some(member);
            }
            self.lower_method(id, objtype);
            return id;
        }

        if self.arena.expr(id).expect_fn_call().methprop.is_some() {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::BadMeth,
                "cannot use a method or property on a value of this type",
            );
            return id;
        }

        let fn_ty = self.arena.type_dcl(objtype);
        if self.arena.ty(fn_ty).as_fn_sig().is_none() {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::NotFn,
                "cannot apply arguments to a non-function",
            );
            return id;
        }

        // Reach the function value through one reference level if needed.
        {
            let objfn = self.arena.expr(id).expect_fn_call().objfn;
            let adapted = auto_deref(self.arena, objfn);
            if adapted != objfn {
                self.arena.expr_mut(id).expect_fn_call_mut().objfn = adapted;
            }
        }

        // A bare, unqualified method name calling a sibling method gets the
        // enclosing function's own receiver as argument 0.
        let objfn = self.arena.expr(id).expect_fn_call().objfn;
        let implicit_self = match self.arena.expr(objfn).as_name_use() {
            Some(nu) => {
                nu.form == NameUseForm::Var
                    && nu.quals.is_none()
                    && nu
                        .decl
                        .is_some_and(|d| self.arena.decl(d).is_meth_prop())
            }
            None => false,
        };
        if implicit_self {
            if let Some(enclosing) = self.state.fnsig {
                let parm0 = self
                    .arena
                    .ty(self.arena.type_dcl(enclosing))
                    .expect_fn_sig()
                    .parms
                    .first()
                    .copied();
                if let Some(parm0) = parm0 {
                    let span = self.arena.expr(id).span;
                    let vtype = self.arena.decl(parm0).vtype;
                    let self_name = self.names.self_name();
                    let self_use = self.arena.alloc_expr(ExprNode {
                        span,
                        vtype,
                        kind: ExprKind::NameUse(NameUse {
                            name: self_name,
                            quals: None,
                            decl: Some(parm0),
                            form: NameUseForm::Var,
                        }),
                    });
                    let call = self.arena.expr_mut(id).expect_fn_call_mut();
                    match call.args.as_mut() {
                        Some(args) => args.insert(0, self_use),
                        None => call.args = Some(vec![self_use]),
                    }
                }
            }
        }

        let (parm_count, rettype) = {
            let sig = self.arena.ty(fn_ty).expect_fn_sig();
            (sig.parms.len(), sig.rettype)
        };
        self.arena.expr_mut(id).vtype = Some(rettype);

        if self.arena.expr(id).expect_fn_call().args.is_none() {
            self.arena.expr_mut(id).expect_fn_call_mut().args = Some(Vec::new());
        }
        let argc = self
            .arena
            .expr(id)
            .expect_fn_call()
            .args
            .as_ref()
            .expect("ensured above")
            .len();
        if argc > parm_count {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::ManyArgs,
                "too many arguments specified vs. function declaration",
            );
            return id;
        }

        self.finalize_args(id, fn_ty);
        id
    }

    fn visit_borrow(&mut self, id: ExprId) -> ExprId {
        self.walk_unary(id);
        let (exp, perm) = match &self.arena.expr(id).kind {
            ExprKind::Borrow(b) => (b.exp, b.perm),
            _ => unreachable!("borrow dispatch"),
        };
        if let Some(inner) = self.arena.expr(exp).vtype {
            let pvtype = self.arena.type_dcl(inner);
            let ref_ty = self.arena.ref_type(pvtype, perm);
            self.arena.expr_mut(id).vtype = Some(ref_ty);
        }
        id
    }

    fn visit_deref(&mut self, id: ExprId) -> ExprId {
        self.walk_unary(id);
        let exp = match &self.arena.expr(id).kind {
            ExprKind::Deref { exp } => *exp,
            _ => unreachable!("deref dispatch"),
        };
        let Some(inner) = self.arena.expr(exp).vtype else {
            return id;
        };
        let pvtype = match &self.arena.ty(self.arena.type_dcl(inner)).kind {
            TypeKind::Ref(r) => r.pvtype,
            TypeKind::Ptr(p) => p.pvtype,
            _ => {
                let span = self.arena.expr(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::InvType,
                    "may only dereference a reference or pointer",
                );
                return id;
            }
        };
        let resolved = self.arena.type_dcl(pvtype);
        self.arena.expr_mut(id).vtype = Some(resolved);
        id
    }

    fn visit_block(&mut self, id: ExprId) -> ExprId {
        self.walk_block(id);
        let last_ty = self
            .arena
            .expr(id)
            .as_block()
            .expect("block dispatch")
            .stmts
            .last()
            .and_then(|stmt| self.arena.expr(*stmt).vtype);
        let vtype = last_ty.unwrap_or(self.arena.prims().void);
        self.arena.expr_mut(id).vtype = Some(vtype);
        id
    }

    fn visit_while(&mut self, id: ExprId) -> ExprId {
        let saved_flags = self.state.flags;
        self.state.flags.insert(PassFlags::WITHIN_WHILE);
        self.walk_while(id);
        self.state.flags = saved_flags;

        let cond = match &self.arena.expr(id).kind {
            ExprKind::While(w) => w.cond,
            _ => unreachable!("while dispatch"),
        };
        if self.arena.expr(cond).vtype.is_some() {
            let bool_ty = self.arena.prims().bool_;
            match coerce(self.arena, bool_ty, cond) {
                Some(adapted) => {
                    if adapted != cond {
                        if let ExprKind::While(w) = &mut self.arena.expr_mut(id).kind {
                            w.cond = adapted;
                        }
                    }
                }
                None => {
                    let span = self.arena.expr(cond).span;
                    self.diags.error_node(
                        span,
                        DiagKind::InvType,
                        "conditional expression must be coercible to a boolean value",
                    );
                }
            }
        }

        let void = self.arena.prims().void;
        self.arena.expr_mut(id).vtype = Some(void);
        id
    }

    fn visit_assign(&mut self, id: ExprId) -> ExprId {
        self.walk_assign(id);
        let (lval, rval) = match &self.arena.expr(id).kind {
            ExprKind::Assign(a) => (a.lval, a.rval),
            _ => unreachable!("assign dispatch"),
        };

        if self.immutable_lval(lval) {
            let span = self.arena.expr(lval).span;
            self.diags.error_node(
                span,
                DiagKind::InvType,
                "may not assign to an immutable target",
            );
        }

        if let Some(lty) = self.arena.expr(lval).vtype {
            if self.arena.expr(rval).vtype.is_some() {
                match coerce(self.arena, lty, rval) {
                    Some(adapted) => {
                        if adapted != rval {
                            if let ExprKind::Assign(a) = &mut self.arena.expr_mut(id).kind {
                                a.rval = adapted;
                            }
                        }
                    }
                    None => {
                        let span = self.arena.expr(rval).span;
                        self.diags.error_node(
                            span,
                            DiagKind::InvType,
                            "assigned value's type does not match the target",
                        );
                    }
                }
            }
            self.arena.expr_mut(id).vtype = Some(lty);
        }
        id
    }

    fn visit_return(&mut self, id: ExprId) -> ExprId {
        self.walk_return(id);
        let exps = match &self.arena.expr(id).kind {
            ExprKind::Return(r) => r.exps.clone(),
            _ => unreachable!("return dispatch"),
        };

        if let Some(fnsig) = self.state.fnsig {
            let rettype = self
                .arena
                .ty(self.arena.type_dcl(fnsig))
                .expect_fn_sig()
                .rettype;
            match exps.len() {
                0 => {}
                1 => {
                    if self.arena.expr(exps[0]).vtype.is_some() {
                        match coerce(self.arena, rettype, exps[0]) {
                            Some(adapted) => {
                                if adapted != exps[0] {
                                    if let ExprKind::Return(r) =
                                        &mut self.arena.expr_mut(id).kind
                                    {
                                        r.exps[0] = adapted;
                                    }
                                }
                            }
                            None => {
                                let span = self.arena.expr(exps[0]).span;
                                self.diags.error_node(
                                    span,
                                    DiagKind::InvType,
                                    "returned value's type does not match the declared return type",
                                );
                            }
                        }
                    }
                }
                n => {
                    let elems = match &self.arena.ty(self.arena.type_dcl(rettype)).kind {
                        TypeKind::Tuple(elems) if elems.len() == n => Some(elems.clone()),
                        _ => None,
                    };
                    match elems {
                        None => {
                            let span = self.arena.expr(id).span;
                            self.diags.error_node(
                                span,
                                DiagKind::InvType,
                                "mismatched number of returned values",
                            );
                        }
                        Some(elems) => {
                            for (index, (elem, exp)) in elems.iter().zip(&exps).enumerate() {
                                if self.arena.expr(*exp).vtype.is_none() {
                                    continue;
                                }
                                match coerce(self.arena, *elem, *exp) {
                                    Some(adapted) => {
                                        if adapted != *exp {
                                            if let ExprKind::Return(r) =
                                                &mut self.arena.expr_mut(id).kind
                                            {
                                                r.exps[index] = adapted;
                                            }
                                        }
                                    }
                                    None => {
                                        let span = self.arena.expr(*exp).span;
                                        self.diags.error_node(
                                            span,
                                            DiagKind::InvType,
                                            "returned value's type does not match the declared return type",
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        let void = self.arena.prims().void;
        self.arena.expr_mut(id).vtype = Some(void);
        id
    }

    fn visit_decl_stmt(&mut self, id: ExprId) -> ExprId {
        let decl = match self.arena.expr(id).kind {
            ExprKind::DeclStmt(decl) => decl,
            _ => unreachable!("decl_stmt dispatch"),
        };
        self.visit_decl(decl);
        let void = self.arena.prims().void;
        self.arena.expr_mut(id).vtype = Some(void);
        id
    }
}
