//! Node arena: program-lifetime storage for every IR node.
//!
//! Expressions, declarations and types live in three indexed stores with
//! O(1) access by id. Nothing is freed before shutdown, so ids stay valid
//! for the whole compilation; child edges are ids, which makes subtree
//! replacement a slot write in the parent.

use crate::ir::{
    ArrayType, DeclId, DeclKind, DeclNode, ExprId, ExprKind, ExprNode, FnSigType, PathType, Perm,
    PrimType, PtrType, RefType, Span, TypeId, TypeKind, TypeNode,
};
use crate::names::Name;

/// Pre-allocated type nodes for the built-in primitives.
///
/// Primitive types are canonical: every slot that means `i32` points at the
/// same node, so primitive equality is id equality.
#[derive(Debug, Clone, Copy)]
pub struct PrimTable {
    pub void: TypeId,
    pub bool_: TypeId,
    pub i8: TypeId,
    pub i16: TypeId,
    pub i32: TypeId,
    pub i64: TypeId,
    pub u8: TypeId,
    pub u16: TypeId,
    pub u32: TypeId,
    pub u64: TypeId,
    pub f32: TypeId,
    pub f64: TypeId,
}

#[derive(Debug)]
pub struct NodeArena {
    exprs: Vec<ExprNode>,
    decls: Vec<DeclNode>,
    types: Vec<TypeNode>,
    prims: PrimTable,
}

impl NodeArena {
    pub fn new() -> Self {
        let mut types = Vec::new();
        let mut prim = |kind: TypeKind| {
            let id = TypeId(types.len() as u32);
            types.push(TypeNode {
                span: Span::DUMMY,
                kind,
            });
            id
        };

        let prims = PrimTable {
            void: prim(TypeKind::Void),
            bool_: prim(TypeKind::Prim(PrimType::Bool)),
            i8: prim(TypeKind::Prim(PrimType::I8)),
            i16: prim(TypeKind::Prim(PrimType::I16)),
            i32: prim(TypeKind::Prim(PrimType::I32)),
            i64: prim(TypeKind::Prim(PrimType::I64)),
            u8: prim(TypeKind::Prim(PrimType::U8)),
            u16: prim(TypeKind::Prim(PrimType::U16)),
            u32: prim(TypeKind::Prim(PrimType::U32)),
            u64: prim(TypeKind::Prim(PrimType::U64)),
            f32: prim(TypeKind::Prim(PrimType::F32)),
            f64: prim(TypeKind::Prim(PrimType::F64)),
        };

        Self {
            exprs: Vec::new(),
            decls: Vec::new(),
            types,
            prims,
        }
    }

    // -----------------------------------------------------------------------
    // Allocation and access
    // -----------------------------------------------------------------------

    pub fn alloc_expr(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(node);
        id
    }

    pub fn alloc_decl(&mut self, node: DeclNode) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(node);
        id
    }

    pub fn alloc_type(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(node);
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.0 as usize]
    }

    #[inline]
    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.exprs[id.0 as usize]
    }

    #[inline]
    pub fn decl(&self, id: DeclId) -> &DeclNode {
        &self.decls[id.0 as usize]
    }

    #[inline]
    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclNode {
        &mut self.decls[id.0 as usize]
    }

    #[inline]
    pub fn ty(&self, id: TypeId) -> &TypeNode {
        &self.types[id.0 as usize]
    }

    #[inline]
    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.0 as usize]
    }

    #[inline]
    pub fn prims(&self) -> &PrimTable {
        &self.prims
    }

    pub fn prim(&self, prim: PrimType) -> TypeId {
        match prim {
            PrimType::Bool => self.prims.bool_,
            PrimType::I8 => self.prims.i8,
            PrimType::I16 => self.prims.i16,
            PrimType::I32 => self.prims.i32,
            PrimType::I64 => self.prims.i64,
            PrimType::U8 => self.prims.u8,
            PrimType::U16 => self.prims.u16,
            PrimType::U32 => self.prims.u32,
            PrimType::U64 => self.prims.u64,
            PrimType::F32 => self.prims.f32,
            PrimType::F64 => self.prims.f64,
        }
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterate every expression id, mainly for whole-tree assertions.
    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        (0..self.exprs.len() as u32).map(ExprId)
    }

    // -----------------------------------------------------------------------
    // Type structure helpers
    // -----------------------------------------------------------------------

    /// Chase a type path to the canonical type it declares. Unresolved
    /// paths stay as they are.
    pub fn type_dcl(&self, ty: TypeId) -> TypeId {
        match &self.ty(ty).kind {
            TypeKind::Path(path) => match path.decl {
                Some(decl) => match &self.decl(decl).kind {
                    DeclKind::Struct(s) => s.ty.unwrap_or(ty),
                    _ => self.decl(decl).vtype.unwrap_or(ty),
                },
                None => ty,
            },
            _ => ty,
        }
    }

    /// Peel one level of reference or pointer, per the lowering rules.
    pub fn deref_type(&self, ty: TypeId) -> TypeId {
        let ty = self.type_dcl(ty);
        match &self.ty(ty).kind {
            TypeKind::Ref(r) => self.type_dcl(r.pvtype),
            TypeKind::Ptr(p) => self.type_dcl(p.pvtype),
            _ => ty,
        }
    }

    /// A method-typed value exposes a method/property namespace.
    pub fn is_method_type(&self, ty: TypeId) -> bool {
        matches!(self.ty(self.type_dcl(ty)).kind, TypeKind::Struct(_))
    }

    /// The struct declaration behind a (possibly referenced) type, if any.
    pub fn struct_of_type(&self, ty: TypeId) -> Option<DeclId> {
        match &self.ty(self.type_dcl(ty)).kind {
            TypeKind::Struct(decl) => Some(*decl),
            _ => None,
        }
    }

    /// Structural type equality, chasing resolved paths.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.type_dcl(a);
        let b = self.type_dcl(b);
        if a == b {
            return true;
        }
        match (&self.ty(a).kind, &self.ty(b).kind) {
            (TypeKind::Void, TypeKind::Void) => true,
            (TypeKind::Prim(pa), TypeKind::Prim(pb)) => pa == pb,
            (TypeKind::Struct(da), TypeKind::Struct(db)) => da == db,
            (TypeKind::Ref(ra), TypeKind::Ref(rb)) => {
                ra.perm == rb.perm
                    && ra.alloc == rb.alloc
                    && ra.nullable == rb.nullable
                    && ra.array_ref == rb.array_ref
                    && self.types_equal(ra.pvtype, rb.pvtype)
            }
            (TypeKind::Ptr(pa), TypeKind::Ptr(pb)) => {
                pa.perm == pb.perm && pa.alloc == pb.alloc && self.types_equal(pa.pvtype, pb.pvtype)
            }
            (TypeKind::Array(aa), TypeKind::Array(ab)) => {
                aa.size == ab.size && self.types_equal(aa.elem, ab.elem)
            }
            (TypeKind::FnSig(sa), TypeKind::FnSig(sb)) => {
                sa.parms.len() == sb.parms.len()
                    && self.types_equal(sa.rettype, sb.rettype)
                    && sa.parms.iter().zip(&sb.parms).all(|(pa, pb)| {
                        match (self.decl(*pa).vtype, self.decl(*pb).vtype) {
                            (Some(ta), Some(tb)) => self.types_equal(ta, tb),
                            _ => false,
                        }
                    })
            }
            (TypeKind::Tuple(ta), TypeKind::Tuple(tb)) => {
                ta.len() == tb.len()
                    && ta.iter().zip(tb).all(|(ea, eb)| self.types_equal(*ea, *eb))
            }
            _ => false,
        }
    }

    /// Value type of an expression node, if the slot has been filled.
    #[inline]
    pub fn expr_type(&self, id: ExprId) -> Option<TypeId> {
        self.expr(id).vtype
    }

    // -----------------------------------------------------------------------
    // Struct member helpers
    // -----------------------------------------------------------------------

    /// Find the first method or property with this name in a struct.
    pub fn find_methprop(&self, owner: DeclId, name: Name) -> Option<DeclId> {
        self.decl(owner).as_struct()?.methprops.find(name)
    }

    /// Append a method to a struct, chaining it onto an existing overload
    /// chain when the name is already taken.
    pub fn add_method(&mut self, owner: DeclId, meth: DeclId) {
        let name = self.decl(meth).name;
        let first = self
            .decl(owner)
            .expect_struct()
            .methprops
            .find(name);

        match first {
            None => {
                self.decl_mut(owner)
                    .expect_struct_mut()
                    .methprops
                    .insert(name, meth);
            }
            Some(first) => {
                let mut tail = first;
                while let Some(next) = self.decl(tail).expect_fn().next_overload {
                    tail = next;
                }
                self.decl_mut(tail).expect_fn_mut().next_overload = Some(meth);
                self.decl_mut(owner)
                    .expect_struct_mut()
                    .methprops
                    .insert(name, meth);
            }
        }
    }

    /// Walk an overload chain in declaration order.
    pub fn overload_chain(&self, first: DeclId) -> Vec<DeclId> {
        let mut chain = vec![first];
        let mut cur = first;
        while let Some(next) = self.decl(cur).as_fn().and_then(|f| f.next_overload) {
            chain.push(next);
            cur = next;
        }
        chain
    }

    // -----------------------------------------------------------------------
    // Subtree copying
    // -----------------------------------------------------------------------

    /// Deep-copy an expression subtree.
    ///
    /// Used when default-argument expressions are spliced into call nodes:
    /// expression edges must stay unique, so the declaration keeps its own
    /// subtree and each call gets a fresh copy (value-type slots included).
    pub fn clone_expr(&mut self, id: ExprId) -> ExprId {
        let node = self.expr(id).clone();
        let kind = match node.kind {
            ExprKind::ULit { value, prim } => ExprKind::ULit { value, prim },
            ExprKind::FLit { value, prim } => ExprKind::FLit { value, prim },
            ExprKind::NameUse(n) => ExprKind::NameUse(n),
            ExprKind::FnCall(call) => {
                let objfn = self.clone_expr(call.objfn);
                let methprop = call.methprop.map(|m| self.clone_expr(m));
                let args = call
                    .args
                    .map(|args| args.into_iter().map(|a| self.clone_expr(a)).collect());
                ExprKind::FnCall(crate::ir::FnCall {
                    objfn,
                    methprop,
                    args,
                })
            }
            ExprKind::FieldAccess(f) => {
                let obj = self.clone_expr(f.obj);
                let member = self.clone_expr(f.member);
                ExprKind::FieldAccess(crate::ir::FieldAccess { obj, member })
            }
            ExprKind::Borrow(b) => {
                let exp = self.clone_expr(b.exp);
                ExprKind::Borrow(crate::ir::Borrow { exp, perm: b.perm })
            }
            ExprKind::Deref { exp } => ExprKind::Deref {
                exp: self.clone_expr(exp),
            },
            ExprKind::CopyVal { exp } => ExprKind::CopyVal {
                exp: self.clone_expr(exp),
            },
            ExprKind::Block(b) => {
                let stmts = b.stmts.into_iter().map(|s| self.clone_expr(s)).collect();
                ExprKind::Block(crate::ir::BlockExpr { stmts })
            }
            ExprKind::While(w) => {
                let cond = self.clone_expr(w.cond);
                let body = self.clone_expr(w.body);
                ExprKind::While(crate::ir::WhileExpr { cond, body })
            }
            ExprKind::Assign(a) => {
                let lval = self.clone_expr(a.lval);
                let rval = self.clone_expr(a.rval);
                ExprKind::Assign(crate::ir::AssignExpr { lval, rval })
            }
            ExprKind::Return(r) => {
                let exps = r.exps.into_iter().map(|e| self.clone_expr(e)).collect();
                ExprKind::Return(crate::ir::ReturnExpr { exps })
            }
            ExprKind::DeclStmt(d) => ExprKind::DeclStmt(d),
        };
        self.alloc_expr(ExprNode {
            span: node.span,
            vtype: node.vtype,
            kind,
        })
    }

    // -----------------------------------------------------------------------
    // Type constructors
    // -----------------------------------------------------------------------

    pub fn ref_type(&mut self, pvtype: TypeId, perm: Perm) -> TypeId {
        self.alloc_type(TypeNode {
            span: Span::DUMMY,
            kind: TypeKind::Ref(RefType {
                pvtype,
                perm,
                alloc: Default::default(),
                scope: 0,
                nullable: false,
                array_ref: false,
            }),
        })
    }

    pub fn ptr_type(&mut self, pvtype: TypeId, perm: Perm) -> TypeId {
        self.alloc_type(TypeNode {
            span: Span::DUMMY,
            kind: TypeKind::Ptr(PtrType {
                pvtype,
                perm,
                alloc: Default::default(),
                scope: 0,
            }),
        })
    }

    pub fn array_type(&mut self, size: u32, elem: TypeId) -> TypeId {
        self.alloc_type(TypeNode {
            span: Span::DUMMY,
            kind: TypeKind::Array(ArrayType { size, elem }),
        })
    }

    pub fn fn_sig_type(&mut self, parms: Vec<DeclId>, rettype: TypeId) -> TypeId {
        self.alloc_type(TypeNode {
            span: Span::DUMMY,
            kind: TypeKind::FnSig(FnSigType { parms, rettype }),
        })
    }

    pub fn path_type(&mut self, name: Name, span: Span) -> TypeId {
        self.alloc_type(TypeNode {
            span,
            kind: TypeKind::Path(PathType { name, decl: None }),
        })
    }

    pub fn tuple_type(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.alloc_type(TypeNode {
            span: Span::DUMMY,
            kind: TypeKind::Tuple(elems),
        })
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DeclFlags;
    use crate::names::NameTable;

    fn var_decl(arena: &mut NodeArena, name: Name, vtype: Option<TypeId>) -> DeclId {
        arena.alloc_decl(DeclNode {
            name,
            span: Span::DUMMY,
            vtype,
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Var(crate::ir::VarDecl {
                perm: Perm::Imm,
                value: None,
                scope: 0,
                index: 0,
            }),
        })
    }

    #[test]
    fn prims_are_canonical() {
        let arena = NodeArena::new();
        assert_eq!(arena.prim(PrimType::I32), arena.prim(PrimType::I32));
        assert_ne!(arena.prim(PrimType::I32), arena.prim(PrimType::I64));
        assert!(arena.types_equal(arena.prims().bool_, arena.prim(PrimType::Bool)));
    }

    #[test]
    fn deref_type_peels_one_level() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let ref_ty = arena.ref_type(i32_ty, Perm::Imm);
        let ref_ref_ty = arena.ref_type(ref_ty, Perm::Imm);

        assert_eq!(arena.deref_type(ref_ty), i32_ty);
        assert_eq!(arena.deref_type(ref_ref_ty), arena.type_dcl(ref_ty));
        assert_eq!(arena.deref_type(i32_ty), i32_ty);
    }

    #[test]
    fn ref_types_compare_structurally() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;
        let a = arena.ref_type(i32_ty, Perm::Imm);
        let b = arena.ref_type(i32_ty, Perm::Imm);
        let c = arena.ref_type(i32_ty, Perm::Mut);

        assert!(arena.types_equal(a, b));
        assert!(!arena.types_equal(a, c));
    }

    #[test]
    fn fn_sigs_compare_by_parameter_types() {
        let mut arena = NodeArena::new();
        let mut names = NameTable::new();
        let n = names.intern("n");

        let i32_ty = arena.prims().i32;
        let f64_ty = arena.prims().f64;

        let p1 = var_decl(&mut arena, n, Some(i32_ty));
        let p2 = var_decl(&mut arena, n, Some(i32_ty));
        let p3 = var_decl(&mut arena, n, Some(f64_ty));

        let sig_a = arena.fn_sig_type(vec![p1], i32_ty);
        let sig_b = arena.fn_sig_type(vec![p2], i32_ty);
        let sig_c = arena.fn_sig_type(vec![p3], i32_ty);

        assert!(arena.types_equal(sig_a, sig_b));
        assert!(!arena.types_equal(sig_a, sig_c));
    }

    #[test]
    fn overload_chain_preserves_declaration_order() {
        let mut arena = NodeArena::new();
        let mut names = NameTable::new();
        let point = names.intern("Point");
        let g = names.intern("g");

        let owner = arena.alloc_decl(DeclNode {
            name: point,
            span: Span::DUMMY,
            vtype: None,
            flags: DeclFlags::EMPTY,
            kind: DeclKind::Struct(crate::ir::StructDecl {
                ty: None,
                methprops: Default::default(),
            }),
        });

        let mut method = |arena: &mut NodeArena| {
            arena.alloc_decl(DeclNode {
                name: g,
                span: Span::DUMMY,
                vtype: None,
                flags: DeclFlags::METH_PROP,
                kind: DeclKind::Fn(crate::ir::FnDecl {
                    body: None,
                    next_overload: None,
                }),
            })
        };
        let m1 = method(&mut arena);
        let m2 = method(&mut arena);
        let m3 = method(&mut arena);

        arena.add_method(owner, m1);
        arena.add_method(owner, m2);
        arena.add_method(owner, m3);

        assert_eq!(arena.find_methprop(owner, g), Some(m1));
        assert_eq!(arena.overload_chain(m1), vec![m1, m2, m3]);
    }

    #[test]
    fn clone_expr_copies_whole_subtree() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.prims().i32;

        let lit = arena.alloc_expr(ExprNode {
            span: Span::new(1, 2),
            vtype: Some(i32_ty),
            kind: ExprKind::ULit {
                value: 7,
                prim: PrimType::I32,
            },
        });
        let copy = arena.alloc_expr(ExprNode {
            span: Span::new(0, 3),
            vtype: Some(i32_ty),
            kind: ExprKind::CopyVal { exp: lit },
        });

        let cloned = arena.clone_expr(copy);
        assert_ne!(cloned, copy);
        assert_eq!(arena.expr(cloned).vtype, Some(i32_ty));
        match arena.expr(cloned).kind {
            ExprKind::CopyVal { exp } => assert_ne!(exp, lit),
            _ => panic!("clone changed the node kind"),
        }
    }
}
