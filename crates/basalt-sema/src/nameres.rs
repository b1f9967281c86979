//! Name resolution pass.
//!
//! Binds every name-use node to the declaration it refers to, re-hooking the
//! name table per traversed scope: modules swap their public names in and
//! out, structs hook their member namespace around member bodies, functions
//! hook their parameters, and blocks hook locals as they appear (so
//! shadowing restores on scope exit).
//!
//! A bare use of a property or method member rewrites into a
//! receiver-qualified form (`x` becomes `self.x`) and the rewritten subtree
//! is visited again, so the later passes only ever see the explicit form.

use basalt_core::arena::NodeArena;
use basalt_core::ir::{
    DeclId, DeclTag, ExprId, ExprKind, ExprNode, FnCall, NameUse, NameUseForm, QualBase, TypeId,
};
use basalt_core::names::NameTable;
use basalt_core::visit::{IrVisitor, Pass, PassFlags, PassState};
use basalt_core::{DiagKind, Reporter};

pub struct NameResolver<'a> {
    arena: &'a mut NodeArena,
    names: &'a mut NameTable,
    diags: &'a mut Reporter,
    state: PassState,
}

impl<'a> NameResolver<'a> {
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
            state: PassState::new(Pass::NameResolution, root),
        }
    }

    /// Run the pass over the root module.
    pub fn run(mut self) {
        let root = self.state.module;
        self.visit_decl(root);
    }

    fn root_module(&self) -> DeclId {
        let mut module = self.state.module;
        while let Some(owner) = self.arena.decl(module).expect_module().owner {
            module = owner;
        }
        module
    }

    /// Swap hooked namespaces between two modules. Works equally well from
    /// parent to child or child to parent; `None` on either side means the
    /// edge of the tree.
    fn module_hook(&mut self, old: Option<DeclId>, new: Option<DeclId>) {
        if old.is_some() {
            self.names.pop_frame();
        }
        if let Some(new) = new {
            self.names.push_frame();
            let nodes = self.arena.decl(new).expect_module().nodes.clone();
            for node in nodes {
                let name = self.arena.decl(node).name;
                self.names.hook(name, node);
            }
        }
    }

    /// Iterative qualified lookup: walk the qualifier names through nested
    /// module namespaces starting at the base module.
    fn resolve_qualified(&mut self, id: ExprId, nu: &NameUse) -> Option<DeclId> {
        let quals = nu.quals.as_ref().expect("caller checked qualifiers");
        let mut module = match quals.base {
            QualBase::Root => self.root_module(),
            QualBase::Current => self.state.module,
        };
        for qual in &quals.names {
            let found = self
                .arena
                .decl(module)
                .expect_module()
                .namespace
                .find(*qual);
            match found {
                Some(next) if self.arena.decl(next).tag() == DeclTag::Module => module = next,
                _ => {
                    let span = self.arena.expr(id).span;
                    self.diags.error_node(
                        span,
                        DiagKind::UnkName,
                        format!("module {} does not exist", self.names.as_str(*qual)),
                    );
                    return None;
                }
            }
        }
        self.arena
            .decl(module)
            .expect_module()
            .namespace
            .find(nu.name)
    }
}

impl<'a> IrVisitor for NameResolver<'a> {
    fn arena(&mut self) -> &mut NodeArena {
        &mut *self.arena
    }

    fn state(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn visit_module(&mut self, id: DeclId) {
        let entry_depth = self.names.depth();
        let saved_module = self.state.module;
        self.state.module = id;
        let owner = self.arena.decl(id).expect_module().owner;

        // Switch the name table over to this module.
        self.module_hook(owner, Some(id));

        // Types of globals and function signatures go first so forward
        // references resolve before any body is walked.
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

        // Switch back to the owner module.
        self.module_hook(Some(id), owner);

        self.state.module = saved_module;
        debug_assert_eq!(self.names.depth(), entry_depth, "unbalanced module hooks");
    }

    fn visit_struct_decl(&mut self, id: DeclId) {
        let entry_depth = self.names.depth();

        // Member names are in scope while member bodies are walked; this is
        // what lets a bare `x` inside a method find the property.
        self.names.push_frame();
        let members = self.arena.decl(id).expect_struct().methprops.nodes.clone();
        for member in &members {
            let name = self.arena.decl(*member).name;
            self.names.hook(name, *member);
        }

        for member in members {
            self.visit_decl(member);
        }

        self.names.pop_frame();
        debug_assert_eq!(self.names.depth(), entry_depth, "unbalanced struct hooks");
    }

    fn visit_fn_decl(&mut self, id: DeclId) {
        let entry_depth = self.names.depth();
        let saved_fnsig = self.state.fnsig;
        let sig = self.arena.decl(id).vtype;
        self.state.fnsig = sig;
        self.state.scope += 1;

        self.names.push_frame();
        if let Some(sig) = sig {
            let parms = match self.arena.ty(self.arena.type_dcl(sig)).as_fn_sig() {
                Some(sig) => sig.parms.clone(),
                None => Vec::new(),
            };
            for parm in parms {
                let name = self.arena.decl(parm).name;
                self.names.hook(name, parm);
            }
            self.visit_type(sig);
        }

        let body = self.arena.decl(id).expect_fn().body;
        if let Some(body) = body {
            let new = self.visit_expr(body);
            if new != body {
                self.arena.decl_mut(id).expect_fn_mut().body = Some(new);
            }
        }

        self.names.pop_frame();
        self.state.scope -= 1;
        self.state.fnsig = saved_fnsig;
        debug_assert_eq!(self.names.depth(), entry_depth, "unbalanced function hooks");
    }

    fn visit_block(&mut self, id: ExprId) -> ExprId {
        let entry_depth = self.names.depth();
        self.names.push_frame();
        self.state.scope += 1;
        self.walk_block(id);
        self.state.scope -= 1;
        self.names.pop_frame();
        debug_assert_eq!(self.names.depth(), entry_depth, "unbalanced block hooks");
        id
    }

    fn visit_decl_stmt(&mut self, id: ExprId) -> ExprId {
        let decl = match self.arena.expr(id).kind {
            ExprKind::DeclStmt(decl) => decl,
            _ => unreachable!("decl_stmt dispatch"),
        };
        // The initializer resolves against the outer binding, so `imm x = x`
        // shadows correctly; only then does the new name hook in.
        self.visit_decl(decl);
        if self.arena.decl(decl).tag() == DeclTag::Var {
            let scope = self.state.scope;
            self.arena.decl_mut(decl).expect_var_mut().scope = scope;
            let name = self.arena.decl(decl).name;
            self.names.hook(name, decl);
        }
        id
    }

    fn visit_while(&mut self, id: ExprId) -> ExprId {
        let saved_flags = self.state.flags;
        self.state.flags.insert(PassFlags::WITHIN_WHILE);
        self.walk_while(id);
        self.state.flags = saved_flags;
        id
    }

    fn visit_name_use(&mut self, id: ExprId) -> ExprId {
        let (name, form, has_quals, already) = {
            let nu = self.arena.expr(id).expect_name_use();
            (nu.name, nu.form, nu.quals.is_some(), nu.decl)
        };
        // Member names resolve during type check, against the receiver's
        // namespace rather than the lexical scope. Revisits of an already
        // bound node are no-ops.
        if form == NameUseForm::Member || already.is_some() {
            return id;
        }

        let decl = if has_quals {
            let nu = self.arena.expr(id).expect_name_use().clone();
            self.resolve_qualified(id, &nu)
        } else {
            self.names.binding(name)
        };

        let Some(decl) = decl else {
            let span = self.arena.expr(id).span;
            self.diags.error_node(
                span,
                DiagKind::UnkName,
                format!(
                    "the name {} does not refer to a declared name",
                    self.names.as_str(name)
                ),
            );
            return id;
        };

        // A bare use of an instance member becomes `self.member`, reusing
        // the ordinary property/method machinery downstream.
        let bound_tag = self.arena.decl(decl).tag();
        let bound_is_member = self.arena.decl(decl).is_meth_prop();
        if bound_tag == DeclTag::Var && bound_is_member && !has_quals {
            let span = self.arena.expr(id).span;
            self.arena.expr_mut(id).expect_name_use_mut().form = NameUseForm::Member;
            let self_use = self.arena.alloc_expr(ExprNode {
                span,
                vtype: None,
                kind: ExprKind::NameUse(NameUse {
                    name: self.names.self_name(),
                    quals: None,
                    decl: None,
                    form: NameUseForm::Unresolved,
                }),
            });
            let call = self.arena.alloc_expr(ExprNode {
                span,
                vtype: None,
                kind: ExprKind::FnCall(FnCall {
                    objfn: self_use,
                    methprop: Some(id),
                    args: None,
                }),
            });
            return self.visit_expr(call);
        }

        let form = match bound_tag {
            DeclTag::Var | DeclTag::Fn => NameUseForm::Var,
            _ => NameUseForm::Type,
        };
        let nu = self.arena.expr_mut(id).expect_name_use_mut();
        nu.decl = Some(decl);
        nu.form = form;
        id
    }

    fn visit_type_path(&mut self, id: TypeId) {
        let (name, resolved) = match self.arena.ty(id).as_path() {
            Some(path) => (path.name, path.decl),
            None => return,
        };
        if resolved.is_some() {
            return;
        }
        match self.names.binding(name) {
            Some(decl) if self.arena.decl(decl).tag() == DeclTag::Struct => {
                self.arena
                    .ty_mut(id)
                    .as_path_mut()
                    .expect("checked path above")
                    .decl = Some(decl);
            }
            Some(_) => {
                let span = self.arena.ty(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::InvType,
                    format!("the name {} does not refer to a type", self.names.as_str(name)),
                );
            }
            None => {
                let span = self.arena.ty(id).span;
                self.diags.error_node(
                    span,
                    DiagKind::UnkName,
                    format!(
                        "the type name {} does not refer to a declared name",
                        self.names.as_str(name)
                    ),
                );
            }
        }
    }
}
