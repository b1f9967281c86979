//! Visitor trait for the analysis passes.
//!
//! The visitor dispatches on node tags; default methods perform the generic
//! child traversal, and pass implementations override the tags they care
//! about. The visitor itself never decides pre- vs post-order: handlers
//! control traversal, because order matters for some nodes (a name use must
//! resolve before its parent rewrites around it).
//!
//! Expression visits return the id of the node that should occupy the slot
//! the caller holds; returning a different id replaces the subtree. The
//! `walk_*` helpers splice replacements back into the parent for you.

use crate::arena::NodeArena;
use crate::ir::{DeclId, DeclTag, ExprId, ExprTag, TypeId, TypeKind};

/// Which pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    NameResolution,
    TypeCheck,
}

/// Bit flags threaded through the pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassFlags(pub u16);

impl PassFlags {
    pub const EMPTY: PassFlags = PassFlags(0);
    /// Set while traversing a while body; consumed by the flow pass.
    pub const WITHIN_WHILE: PassFlags = PassFlags(1 << 0);

    #[inline]
    pub fn contains(self, other: PassFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: PassFlags) {
        self.0 |= other.0;
    }
}

/// State threaded through a pass over the tree.
#[derive(Debug, Clone, Copy)]
pub struct PassState {
    pub pass: Pass,
    /// Module currently being traversed.
    pub module: DeclId,
    /// Signature of the enclosing function, absent outside function bodies.
    pub fnsig: Option<TypeId>,
    /// Lexical scope depth: 0 at module level, >= 1 inside functions.
    pub scope: u16,
    pub flags: PassFlags,
}

impl PassState {
    pub fn new(pass: Pass, module: DeclId) -> Self {
        Self {
            pass,
            module,
            fnsig: None,
            scope: 0,
            flags: PassFlags::EMPTY,
        }
    }
}

/// Polymorphic tree walk over the IR.
pub trait IrVisitor {
    fn arena(&mut self) -> &mut NodeArena;
    fn state(&mut self) -> &mut PassState;

    // -----------------------------------------------------------------------
    // Expression dispatch
    // -----------------------------------------------------------------------

    fn visit_expr(&mut self, id: ExprId) -> ExprId {
        let tag = self.arena().expr(id).tag();
        match tag {
            ExprTag::ULit => self.visit_ulit(id),
            ExprTag::FLit => self.visit_flit(id),
            ExprTag::NameUse => self.visit_name_use(id),
            ExprTag::FnCall => self.visit_fn_call(id),
            ExprTag::FieldAccess => self.visit_field_access(id),
            ExprTag::Borrow => self.visit_borrow(id),
            ExprTag::Deref => self.visit_deref(id),
            ExprTag::CopyVal => self.visit_copy(id),
            ExprTag::Block => self.visit_block(id),
            ExprTag::While => self.visit_while(id),
            ExprTag::Assign => self.visit_assign(id),
            ExprTag::Return => self.visit_return(id),
            ExprTag::DeclStmt => self.visit_decl_stmt(id),
        }
    }

    fn visit_ulit(&mut self, id: ExprId) -> ExprId {
        id
    }

    fn visit_flit(&mut self, id: ExprId) -> ExprId {
        id
    }

    fn visit_name_use(&mut self, id: ExprId) -> ExprId {
        id
    }

    fn visit_fn_call(&mut self, id: ExprId) -> ExprId {
        self.walk_fn_call(id);
        id
    }

    fn visit_field_access(&mut self, id: ExprId) -> ExprId {
        self.walk_field_access(id);
        id
    }

    fn visit_borrow(&mut self, id: ExprId) -> ExprId {
        self.walk_unary(id);
        id
    }

    fn visit_deref(&mut self, id: ExprId) -> ExprId {
        self.walk_unary(id);
        id
    }

    fn visit_copy(&mut self, id: ExprId) -> ExprId {
        self.walk_unary(id);
        id
    }

    fn visit_block(&mut self, id: ExprId) -> ExprId {
        self.walk_block(id);
        id
    }

    fn visit_while(&mut self, id: ExprId) -> ExprId {
        self.walk_while(id);
        id
    }

    fn visit_assign(&mut self, id: ExprId) -> ExprId {
        self.walk_assign(id);
        id
    }

    fn visit_return(&mut self, id: ExprId) -> ExprId {
        self.walk_return(id);
        id
    }

    fn visit_decl_stmt(&mut self, id: ExprId) -> ExprId {
        let decl = match self.arena().expr(id).kind {
            crate::ir::ExprKind::DeclStmt(d) => d,
            _ => unreachable!("decl_stmt dispatch"),
        };
        self.visit_decl(decl);
        id
    }

    // -----------------------------------------------------------------------
    // Expression child traversal
    // -----------------------------------------------------------------------

    /// Visit arguments first, then the object/function expression; the
    /// member name is left for the handler, since its meaning depends on
    /// the receiver's type.
    fn walk_fn_call(&mut self, id: ExprId) {
        let (args, objfn) = {
            let call = self.arena().expr(id).expect_fn_call();
            (call.args.clone(), call.objfn)
        };
        if let Some(args) = args {
            for (index, arg) in args.iter().enumerate() {
                let new = self.visit_expr(*arg);
                if new != *arg {
                    let call = self.arena().expr_mut(id).expect_fn_call_mut();
                    call.args.as_mut().expect("args present above")[index] = new;
                }
            }
        }
        let new = self.visit_expr(objfn);
        if new != objfn {
            self.arena().expr_mut(id).expect_fn_call_mut().objfn = new;
        }
    }

    fn walk_field_access(&mut self, id: ExprId) {
        let obj = match &self.arena().expr(id).kind {
            crate::ir::ExprKind::FieldAccess(f) => f.obj,
            _ => unreachable!("field_access dispatch"),
        };
        let new = self.visit_expr(obj);
        if new != obj {
            if let crate::ir::ExprKind::FieldAccess(f) = &mut self.arena().expr_mut(id).kind {
                f.obj = new;
            }
        }
    }

    fn walk_unary(&mut self, id: ExprId) {
        use crate::ir::ExprKind;
        let exp = match &self.arena().expr(id).kind {
            ExprKind::Borrow(b) => b.exp,
            ExprKind::Deref { exp } => *exp,
            ExprKind::CopyVal { exp } => *exp,
            _ => unreachable!("unary dispatch"),
        };
        let new = self.visit_expr(exp);
        if new != exp {
            match &mut self.arena().expr_mut(id).kind {
                ExprKind::Borrow(b) => b.exp = new,
                ExprKind::Deref { exp } => *exp = new,
                ExprKind::CopyVal { exp } => *exp = new,
                _ => unreachable!("unary dispatch"),
            }
        }
    }

    fn walk_block(&mut self, id: ExprId) {
        let stmts = match &self.arena().expr(id).kind {
            crate::ir::ExprKind::Block(b) => b.stmts.clone(),
            _ => unreachable!("block dispatch"),
        };
        for (index, stmt) in stmts.iter().enumerate() {
            let new = self.visit_expr(*stmt);
            if new != *stmt {
                if let crate::ir::ExprKind::Block(b) = &mut self.arena().expr_mut(id).kind {
                    b.stmts[index] = new;
                }
            }
        }
    }

    fn walk_while(&mut self, id: ExprId) {
        let (cond, body) = match &self.arena().expr(id).kind {
            crate::ir::ExprKind::While(w) => (w.cond, w.body),
            _ => unreachable!("while dispatch"),
        };
        let new_cond = self.visit_expr(cond);
        let new_body = self.visit_expr(body);
        if let crate::ir::ExprKind::While(w) = &mut self.arena().expr_mut(id).kind {
            w.cond = new_cond;
            w.body = new_body;
        }
    }

    fn walk_assign(&mut self, id: ExprId) {
        let (lval, rval) = match &self.arena().expr(id).kind {
            crate::ir::ExprKind::Assign(a) => (a.lval, a.rval),
            _ => unreachable!("assign dispatch"),
        };
        let new_lval = self.visit_expr(lval);
        let new_rval = self.visit_expr(rval);
        if let crate::ir::ExprKind::Assign(a) = &mut self.arena().expr_mut(id).kind {
            a.lval = new_lval;
            a.rval = new_rval;
        }
    }

    fn walk_return(&mut self, id: ExprId) {
        let exps = match &self.arena().expr(id).kind {
            crate::ir::ExprKind::Return(r) => r.exps.clone(),
            _ => unreachable!("return dispatch"),
        };
        for (index, exp) in exps.iter().enumerate() {
            let new = self.visit_expr(*exp);
            if new != *exp {
                if let crate::ir::ExprKind::Return(r) = &mut self.arena().expr_mut(id).kind {
                    r.exps[index] = new;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Declaration dispatch
    // -----------------------------------------------------------------------

    fn visit_decl(&mut self, id: DeclId) {
        let tag = self.arena().decl(id).tag();
        match tag {
            DeclTag::Var => self.visit_var_decl(id),
            DeclTag::Fn => self.visit_fn_decl(id),
            DeclTag::Struct => self.visit_struct_decl(id),
            DeclTag::Module => self.visit_module(id),
        }
    }

    fn visit_var_decl(&mut self, id: DeclId) {
        self.walk_var_decl(id);
    }

    fn visit_fn_decl(&mut self, id: DeclId) {
        self.walk_fn_decl(id);
    }

    fn visit_struct_decl(&mut self, id: DeclId) {
        self.walk_struct_decl(id);
    }

    fn visit_module(&mut self, id: DeclId) {
        self.walk_module(id);
    }

    fn walk_var_decl(&mut self, id: DeclId) {
        let (vtype, value) = {
            let decl = self.arena().decl(id);
            (decl.vtype, decl.expect_var().value)
        };
        if let Some(ty) = vtype {
            self.visit_type(ty);
        }
        if let Some(value) = value {
            let new = self.visit_expr(value);
            if new != value {
                self.arena().decl_mut(id).expect_var_mut().value = Some(new);
            }
        }
    }

    fn walk_fn_decl(&mut self, id: DeclId) {
        let (sig, body) = {
            let decl = self.arena().decl(id);
            (decl.vtype, decl.expect_fn().body)
        };
        if let Some(sig) = sig {
            self.visit_type(sig);
        }
        if let Some(body) = body {
            let new = self.visit_expr(body);
            if new != body {
                self.arena().decl_mut(id).expect_fn_mut().body = Some(new);
            }
        }
    }

    fn walk_struct_decl(&mut self, id: DeclId) {
        let members = self.arena().decl(id).expect_struct().methprops.nodes.clone();
        for member in members {
            self.visit_decl(member);
        }
    }

    fn walk_module(&mut self, id: DeclId) {
        let nodes = self.arena().decl(id).expect_module().nodes.clone();
        for node in nodes {
            self.visit_decl(node);
        }
    }

    // -----------------------------------------------------------------------
    // Type dispatch
    // -----------------------------------------------------------------------

    fn visit_type(&mut self, id: TypeId) {
        enum Walk {
            None,
            One(TypeId),
            Sig(Vec<DeclId>, TypeId),
            Many(Vec<TypeId>),
            Path,
        }
        let walk = match &self.arena().ty(id).kind {
            TypeKind::Ref(r) => Walk::One(r.pvtype),
            TypeKind::Ptr(p) => Walk::One(p.pvtype),
            TypeKind::Array(a) => Walk::One(a.elem),
            TypeKind::FnSig(sig) => Walk::Sig(sig.parms.clone(), sig.rettype),
            TypeKind::Tuple(elems) => Walk::Many(elems.clone()),
            TypeKind::Path(_) => Walk::Path,
            TypeKind::Void | TypeKind::Prim(_) | TypeKind::Struct(_) => Walk::None,
        };
        match walk {
            Walk::None => {}
            Walk::One(inner) => self.visit_type(inner),
            Walk::Sig(parms, ret) => {
                for parm in parms {
                    self.visit_decl(parm);
                }
                self.visit_type(ret);
            }
            Walk::Many(elems) => {
                for elem in elems {
                    self.visit_type(elem);
                }
            }
            Walk::Path => self.visit_type_path(id),
        }
    }

    /// Hook for resolving a type path; the default leaves it untouched.
    fn visit_type_path(&mut self, _id: TypeId) {}
}
