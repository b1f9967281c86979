//! Parser-facing IR construction.
//!
//! The front-end's parser (an external collaborator) builds the tree through
//! this API, which enforces the parse-time contract the analysis passes rely
//! on: module-level names are hooked into the name table eagerly so
//! duplicates are caught immediately, struct members get the
//! method-or-property flag and their position index, methods grow an
//! implicit `self` parameter, and operator expressions are ordinary call
//! nodes under special interned names.
//!
//! Tests drive the same API to build programs without a parser.

use basalt_error::{DiagKind, Reporter, Span};

use crate::arena::NodeArena;
use crate::ir::{
    AssignExpr, BlockExpr, Borrow, DeclFlags, DeclId, DeclKind, DeclNode, ExprId, ExprKind,
    ExprNode, FnCall, FnDecl, FieldAccess, ModuleDecl, NameUse, NameUseForm, Perm, PrimType,
    QualBase, QualPath, ReturnExpr, StructDecl, TypeId, VarDecl, WhileExpr,
};
use crate::names::{Name, NameTable};

pub struct IrBuilder<'a> {
    pub arena: &'a mut NodeArena,
    pub names: &'a mut NameTable,
    pub diags: &'a mut Reporter,
    /// Position the parser is currently at; copied into every node built.
    span: Span,
}

impl<'a> IrBuilder<'a> {
    pub fn new(
        arena: &'a mut NodeArena,
        names: &'a mut NameTable,
        diags: &'a mut Reporter,
    ) -> Self {
        Self {
            arena,
            names,
            diags,
            span: Span::DUMMY,
        }
    }

    /// Set the lexer position for nodes built from here on.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    // -----------------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------------

    /// Create a module. The root module passes `None` for its name.
    pub fn module(&mut self, name: Option<&str>) -> DeclId {
        let name = self.names.intern(name.unwrap_or(""));
        self.arena.alloc_decl(DeclNode {
            name,
            span: self.span,
            vtype: None,
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Module(ModuleDecl::default()),
        })
    }

    /// Add a declaration to a module, keeping every parse-time invariant:
    /// the node joins the ordered list; its name is hooked into the global
    /// name table (duplicates raise `DupName` against both definitions);
    /// and non-private names join the module's public namespace.
    pub fn module_add(&mut self, module: DeclId, decl: DeclId) {
        self.arena
            .decl_mut(module)
            .expect_module_mut()
            .nodes
            .push(decl);

        let name = self.arena.decl(decl).name;
        if let Some(prior) = self.names.binding(name) {
            tracing::debug!(
                name = self.names.as_str(name),
                "duplicate module-level declaration"
            );
            let span = self.arena.decl(decl).span;
            let prior_span = self.arena.decl(prior).span;
            self.diags.error_node(
                span,
                DiagKind::DupName,
                "global name is already defined, duplicates not allowed",
            );
            self.diags.error_node(
                prior_span,
                DiagKind::DupName,
                "this is the conflicting definition for that name",
            );
            return;
        }

        self.names.hook(name, decl);
        if !self.names.is_private(name) {
            self.arena
                .decl_mut(module)
                .expect_module_mut()
                .namespace
                .set(name, decl);
        }
        if let DeclKind::Module(child) = &mut self.arena.decl_mut(decl).kind {
            child.owner = Some(module);
        }
    }

    // -----------------------------------------------------------------------
    // Structs
    // -----------------------------------------------------------------------

    /// Create a struct declaration together with its canonical type node.
    pub fn struct_decl(&mut self, name: &str) -> DeclId {
        let name = self.names.intern(name);
        let decl = self.arena.alloc_decl(DeclNode {
            name,
            span: self.span,
            vtype: None,
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Struct(StructDecl {
                ty: None,
                methprops: Default::default(),
            }),
        });
        let ty = self.arena.alloc_type(crate::ir::TypeNode {
            span: self.span,
            kind: crate::ir::TypeKind::Struct(decl),
        });
        let node = self.arena.decl_mut(decl);
        node.vtype = Some(ty);
        node.expect_struct_mut().ty = Some(ty);
        decl
    }

    /// Add a property to a struct. Properties default to `mut` permission,
    /// live at scope depth 1, and record their position. A private property
    /// without a default marks the struct private-no-default; a struct that
    /// ends up with zero properties is opaque (callers apply
    /// [`IrBuilder::struct_finish`] once members are in).
    pub fn struct_add_prop(&mut self, owner: DeclId, prop: DeclId) {
        let index = self
            .arena
            .decl(owner)
            .expect_struct()
            .methprops
            .nodes
            .iter()
            .filter(|m| self.arena.decl(**m).as_var().is_some())
            .count() as u16;

        let name = {
            let node = self.arena.decl_mut(prop);
            node.flags.insert(DeclFlags::METH_PROP);
            let var = node.expect_var_mut();
            var.scope = 1;
            var.index = index;
            node.name
        };

        let no_default = self.arena.decl(prop).expect_var().value.is_none();
        if self.names.is_private(name) && no_default {
            self.arena
                .decl_mut(owner)
                .flags
                .insert(DeclFlags::PRIVATE_NO_DEFAULT);
        }

        self.arena
            .decl_mut(owner)
            .expect_struct_mut()
            .methprops
            .insert(name, prop);
    }

    /// Add a method to a struct, chaining overloads in declaration order.
    pub fn struct_add_method(&mut self, owner: DeclId, meth: DeclId) {
        self.arena.decl_mut(meth).flags.insert(DeclFlags::METH_PROP);
        self.arena.add_method(owner, meth);
    }

    /// Add a setter method.
    pub fn struct_add_set_method(&mut self, owner: DeclId, meth: DeclId) {
        self.arena.decl_mut(meth).flags.insert(DeclFlags::SET_METHOD);
        self.struct_add_method(owner, meth);
    }

    /// Finish a struct: a struct with no properties is opaque.
    pub fn struct_finish(&mut self, owner: DeclId) {
        let has_props = self
            .arena
            .decl(owner)
            .expect_struct()
            .methprops
            .nodes
            .iter()
            .any(|m| self.arena.decl(*m).as_var().is_some());
        if !has_props {
            self.arena.decl_mut(owner).flags.insert(DeclFlags::OPAQUE);
        }
    }

    // -----------------------------------------------------------------------
    // Variables and functions
    // -----------------------------------------------------------------------

    pub fn var_decl(
        &mut self,
        name: &str,
        perm: Perm,
        vtype: Option<TypeId>,
        value: Option<ExprId>,
    ) -> DeclId {
        let name = self.names.intern(name);
        self.arena.alloc_decl(DeclNode {
            name,
            span: self.span,
            vtype,
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Var(VarDecl {
                perm,
                value,
                scope: 0,
                index: 0,
            }),
        })
    }

    /// A function parameter: an `imm` variable at scope depth 1 with an
    /// optional default value.
    pub fn param(&mut self, name: &str, vtype: TypeId, default: Option<ExprId>) -> DeclId {
        let decl = self.var_decl(name, Perm::Imm, Some(vtype), default);
        self.arena.decl_mut(decl).expect_var_mut().scope = 1;
        decl
    }

    /// Build a signature type, numbering and flagging the parameters.
    pub fn fn_sig(&mut self, parms: Vec<DeclId>, rettype: TypeId) -> TypeId {
        for (index, parm) in parms.iter().enumerate() {
            let decl = self.arena.decl_mut(*parm);
            decl.flags.insert(DeclFlags::PARM);
            decl.expect_var_mut().index = index as u16;
        }
        self.arena.fn_sig_type(parms, rettype)
    }

    pub fn fn_decl(&mut self, name: &str, sig: TypeId, body: Option<ExprId>) -> DeclId {
        let name = self.names.intern(name);
        self.arena.alloc_decl(DeclNode {
            name,
            span: self.span,
            vtype: Some(sig),
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Fn(FnDecl {
                body,
                next_overload: None,
            }),
        })
    }

    /// The implicit `self` parameter a method receives when none is
    /// written: a `const` variable of the owning type at position 0.
    pub fn self_param(&mut self, owner: DeclId) -> DeclId {
        let ty = self
            .arena
            .decl(owner)
            .expect_struct()
            .ty
            .expect("struct type allocated with the declaration");
        let name = self.names.self_name();
        self.arena.alloc_decl(DeclNode {
            name,
            span: self.span,
            vtype: Some(ty),
            flags: DeclFlags::MAY_CONST,
            kind: DeclKind::Var(VarDecl {
                perm: Perm::Const,
                value: None,
                scope: 1,
                index: 0,
            }),
        })
    }

    /// A method signature: injects `self` ahead of the declared parameters.
    pub fn method_sig(&mut self, owner: DeclId, parms: Vec<DeclId>, rettype: TypeId) -> TypeId {
        let mut all = Vec::with_capacity(parms.len() + 1);
        all.push(self.self_param(owner));
        all.extend(parms);
        self.fn_sig(all, rettype)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.arena.alloc_expr(ExprNode {
            span: self.span,
            vtype: None,
            kind,
        })
    }

    pub fn ulit(&mut self, value: u64, prim: PrimType) -> ExprId {
        self.expr(ExprKind::ULit { value, prim })
    }

    pub fn flit(&mut self, value: f64, prim: PrimType) -> ExprId {
        self.expr(ExprKind::FLit { value, prim })
    }

    pub fn name_use(&mut self, name: &str) -> ExprId {
        let name = self.names.intern(name);
        self.expr(ExprKind::NameUse(NameUse {
            name,
            quals: None,
            decl: None,
            form: NameUseForm::Unresolved,
        }))
    }

    /// A qualified name use, e.g. `geo::shapes::Point`.
    pub fn qual_name_use(&mut self, base: QualBase, quals: &[&str], name: &str) -> ExprId {
        let quals: smallvec::SmallVec<[Name; 4]> =
            quals.iter().map(|q| self.names.intern(q)).collect();
        let name = self.names.intern(name);
        self.expr(ExprKind::NameUse(NameUse {
            name,
            quals: Some(QualPath { base, names: quals }),
            decl: None,
            form: NameUseForm::Unresolved,
        }))
    }

    /// A member name in method/property position.
    pub fn member_name(&mut self, name: &str) -> ExprId {
        let name = self.names.intern(name);
        self.expr(ExprKind::NameUse(NameUse {
            name,
            quals: None,
            decl: None,
            form: NameUseForm::Member,
        }))
    }

    pub fn fn_call(&mut self, objfn: ExprId, args: Option<Vec<ExprId>>) -> ExprId {
        self.expr(ExprKind::FnCall(FnCall {
            objfn,
            methprop: None,
            args,
        }))
    }

    /// A method or property call: `obj.name(args)`.
    pub fn method_call(&mut self, obj: ExprId, name: &str, args: Option<Vec<ExprId>>) -> ExprId {
        let methprop = self.member_name(name);
        self.expr(ExprKind::FnCall(FnCall {
            objfn: obj,
            methprop: Some(methprop),
            args,
        }))
    }

    /// Operator sugar: `a + b` is a call with methprop `+` on `a`.
    pub fn op_call(&mut self, obj: ExprId, op: &str, args: Vec<ExprId>) -> ExprId {
        self.method_call(obj, op, Some(args))
    }

    pub fn field_access(&mut self, obj: ExprId, member: ExprId) -> ExprId {
        self.expr(ExprKind::FieldAccess(FieldAccess { obj, member }))
    }

    pub fn borrow(&mut self, exp: ExprId, perm: Perm) -> ExprId {
        self.expr(ExprKind::Borrow(Borrow { exp, perm }))
    }

    pub fn deref(&mut self, exp: ExprId) -> ExprId {
        self.expr(ExprKind::Deref { exp })
    }

    pub fn block(&mut self, stmts: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Block(BlockExpr { stmts }))
    }

    pub fn while_loop(&mut self, cond: ExprId, body: ExprId) -> ExprId {
        self.expr(ExprKind::While(WhileExpr { cond, body }))
    }

    pub fn assign(&mut self, lval: ExprId, rval: ExprId) -> ExprId {
        self.expr(ExprKind::Assign(AssignExpr { lval, rval }))
    }

    pub fn ret(&mut self, exps: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Return(ReturnExpr { exps }))
    }

    pub fn decl_stmt(&mut self, decl: DeclId) -> ExprId {
        self.expr(ExprKind::DeclStmt(decl))
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    /// A type named in source, resolved later.
    pub fn type_path(&mut self, name: &str) -> TypeId {
        let name = self.names.intern(name);
        self.arena.path_type(name, self.span)
    }
}
