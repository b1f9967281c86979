//! IR node model for the analysis passes.
//!
//! The tree the parser hands over is heterogeneous: declarations,
//! expressions and types each form a tagged sum. Nodes live in the
//! [`crate::arena::NodeArena`] and reference each other through `u32` id
//! newtypes, so a handler rewrites a subtree by returning a replacement id
//! that its caller splices into the parent's slot.
//!
//! Every expression node carries a *value-type slot* (`vtype`), empty until
//! the type-check pass fills it. Type nodes are shared freely between slots
//! (they form a DAG); expression and declaration edges are unique.

use smallvec::SmallVec;
use strum_macros::Display;

use crate::names::Name;

pub use basalt_error::Span;

/// Unique id of an expression node within an arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ExprId(pub u32);

/// Unique id of a declaration node within an arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct DeclId(pub u32);

/// Unique id of a type node within an arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(pub u32);

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl std::fmt::Display for DeclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Permissions, allocators, primitives
// ---------------------------------------------------------------------------

/// Mutability/uniqueness qualifier carried by every reference and variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Perm {
    Imm,
    Mut,
    Mut1,
    Uni,
    Const,
    Opaque,
}

impl Perm {
    /// Whether a variable or property declaration may carry this permission.
    /// `const` is admissible only where the parser set the may-const flag.
    pub fn is_declarable(self, may_const: bool) -> bool {
        match self {
            Perm::Mut1 | Perm::Uni | Perm::Opaque => false,
            Perm::Const => may_const,
            Perm::Imm | Perm::Mut => true,
        }
    }

    /// Whether a value behind this permission may be stored into.
    pub fn is_mutable(self) -> bool {
        matches!(self, Perm::Mut | Perm::Mut1 | Perm::Uni)
    }
}

/// Allocation strategy tag attached to a reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Alloc {
    /// Borrowed reference, no allocator involved.
    #[default]
    Borrow,
    /// Single-owner allocation.
    Own,
    /// Reference-counted allocation.
    Rc,
}

/// Built-in primitive value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PrimType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimType {
    pub fn is_signed_int(self) -> bool {
        matches!(self, PrimType::I8 | PrimType::I16 | PrimType::I32 | PrimType::I64)
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(self, PrimType::U8 | PrimType::U16 | PrimType::U32 | PrimType::U64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimType::F32 | PrimType::F64)
    }

    /// Bit width, used by the widening rule.
    pub fn width(self) -> u8 {
        match self {
            PrimType::Bool => 1,
            PrimType::I8 | PrimType::U8 => 8,
            PrimType::I16 | PrimType::U16 => 16,
            PrimType::I32 | PrimType::U32 | PrimType::F32 => 32,
            PrimType::I64 | PrimType::U64 | PrimType::F64 => 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Declaration nodes
// ---------------------------------------------------------------------------

/// Flag set carried by every declaration node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeclFlags(pub u16);

impl DeclFlags {
    pub const EMPTY: DeclFlags = DeclFlags(0);
    /// Declaration is a method or property member of a type.
    pub const METH_PROP: DeclFlags = DeclFlags(1 << 0);
    /// Method is a property setter.
    pub const SET_METHOD: DeclFlags = DeclFlags(1 << 1);
    /// Parser allows a `const` permission on this declaration.
    pub const MAY_CONST: DeclFlags = DeclFlags(1 << 2);
    /// Struct has no properties and cannot be instantiated.
    pub const OPAQUE: DeclFlags = DeclFlags(1 << 3);
    /// Struct has a private property without a default value.
    pub const PRIVATE_NO_DEFAULT: DeclFlags = DeclFlags(1 << 4);
    /// Variable is a function parameter.
    pub const PARM: DeclFlags = DeclFlags(1 << 5);

    #[inline]
    pub fn contains(self, other: DeclFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: DeclFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for DeclFlags {
    type Output = DeclFlags;

    fn bitor(self, rhs: DeclFlags) -> DeclFlags {
        DeclFlags(self.0 | rhs.0)
    }
}

/// Tag of a declaration node, for dispatch without borrowing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeclTag {
    Var,
    Fn,
    Struct,
    Module,
}

#[derive(Debug, Clone)]
pub struct DeclNode {
    pub name: Name,
    pub span: Span,
    /// Value-type slot. For variables this is the declared or inferred type,
    /// for functions the signature type, for structs the canonical struct
    /// type. Empty until resolution fills it.
    pub vtype: Option<TypeId>,
    pub flags: DeclFlags,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
    Module(ModuleDecl),
}

/// Variable declaration: module global, local, parameter or property.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub perm: Perm,
    /// Initializer, property default, or parameter default.
    pub value: Option<ExprId>,
    /// 0 = module level, >= 1 nested in a function or type.
    pub scope: u16,
    /// Position when used as a parameter or property.
    pub index: u16,
}

/// Function or method declaration. Methods sharing a name chain through
/// `next_overload` in declaration order.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub body: Option<ExprId>,
    pub next_overload: Option<DeclId>,
}

/// Struct-like type declaration: ordered properties plus methods.
#[derive(Debug, Clone)]
pub struct StructDecl {
    /// Canonical type node for this struct, shared by every value-type slot
    /// that names it.
    pub ty: Option<TypeId>,
    pub methprops: MethProps,
}

/// Module: ordered declaration list plus the public-name namespace.
#[derive(Debug, Clone, Default)]
pub struct ModuleDecl {
    pub nodes: Vec<DeclId>,
    pub namespace: Namespace,
    pub owner: Option<DeclId>,
}

impl DeclNode {
    pub fn tag(&self) -> DeclTag {
        match self.kind {
            DeclKind::Var(_) => DeclTag::Var,
            DeclKind::Fn(_) => DeclTag::Fn,
            DeclKind::Struct(_) => DeclTag::Struct,
            DeclKind::Module(_) => DeclTag::Module,
        }
    }

    pub fn is_meth_prop(&self) -> bool {
        self.flags.contains(DeclFlags::METH_PROP)
    }

    pub fn as_var(&self) -> Option<&VarDecl> {
        match &self.kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_var_mut(&mut self) -> Option<&mut VarDecl> {
        match &mut self.kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn expect_var(&self) -> &VarDecl {
        self.as_var().expect("expected a variable declaration")
    }

    pub fn expect_var_mut(&mut self) -> &mut VarDecl {
        self.as_var_mut().expect("expected a variable declaration")
    }

    pub fn as_fn(&self) -> Option<&FnDecl> {
        match &self.kind {
            DeclKind::Fn(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_fn_mut(&mut self) -> Option<&mut FnDecl> {
        match &mut self.kind {
            DeclKind::Fn(f) => Some(f),
            _ => None,
        }
    }

    pub fn expect_fn(&self) -> &FnDecl {
        self.as_fn().expect("expected a function declaration")
    }

    pub fn expect_fn_mut(&mut self) -> &mut FnDecl {
        self.as_fn_mut().expect("expected a function declaration")
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match &self.kind {
            DeclKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructDecl> {
        match &mut self.kind {
            DeclKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn expect_struct(&self) -> &StructDecl {
        self.as_struct().expect("expected a struct declaration")
    }

    pub fn expect_struct_mut(&mut self) -> &mut StructDecl {
        self.as_struct_mut().expect("expected a struct declaration")
    }

    pub fn as_module(&self) -> Option<&ModuleDecl> {
        match &self.kind {
            DeclKind::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_module_mut(&mut self) -> Option<&mut ModuleDecl> {
        match &mut self.kind {
            DeclKind::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn expect_module(&self) -> &ModuleDecl {
        self.as_module().expect("expected a module declaration")
    }

    pub fn expect_module_mut(&mut self) -> &mut ModuleDecl {
        self.as_module_mut().expect("expected a module declaration")
    }
}

// ---------------------------------------------------------------------------
// Namespace containers
// ---------------------------------------------------------------------------

/// Map from name handle to declaration, used for module public names.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    map: std::collections::HashMap<Name, DeclId>,
}

impl Namespace {
    pub fn find(&self, name: Name) -> Option<DeclId> {
        self.map.get(&name).copied()
    }

    pub fn set(&mut self, name: Name, decl: DeclId) {
        self.map.insert(name, decl);
    }

    pub fn contains(&self, name: Name) -> bool {
        self.map.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Ordered property/method namespace of a struct-like type.
///
/// `nodes` preserves declaration order; `map` points at the *first*
/// declaration with each name. Overloaded methods chain from that first
/// declaration through [`FnDecl::next_overload`].
#[derive(Debug, Clone, Default)]
pub struct MethProps {
    pub nodes: Vec<DeclId>,
    map: std::collections::HashMap<Name, DeclId>,
}

impl MethProps {
    pub fn find(&self, name: Name) -> Option<DeclId> {
        self.map.get(&name).copied()
    }

    /// Record a member. The first declaration with a name owns the map
    /// entry; callers link overloads onto it separately.
    pub fn insert(&mut self, name: Name, decl: DeclId) {
        self.nodes.push(decl);
        self.map.entry(name).or_insert(decl);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Type nodes
// ---------------------------------------------------------------------------

/// Tag of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TypeTag {
    Void,
    Prim,
    Ref,
    Ptr,
    Array,
    FnSig,
    Struct,
    Tuple,
    Path,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub span: Span,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Prim(PrimType),
    Ref(RefType),
    Ptr(PtrType),
    Array(ArrayType),
    FnSig(FnSigType),
    /// A struct-like (method-typed) value type, by declaration.
    Struct(DeclId),
    /// Multiple-value return type.
    Tuple(Vec<TypeId>),
    /// Unresolved type name from the parser; `decl` is filled by name
    /// resolution.
    Path(PathType),
}

/// Reference type: value type plus permission, allocator and lifetime.
#[derive(Debug, Clone)]
pub struct RefType {
    pub pvtype: TypeId,
    pub perm: Perm,
    pub alloc: Alloc,
    pub scope: u16,
    pub nullable: bool,
    /// Discriminates an array reference (slice) from a plain reference.
    pub array_ref: bool,
}

#[derive(Debug, Clone)]
pub struct PtrType {
    pub pvtype: TypeId,
    pub perm: Perm,
    pub alloc: Alloc,
    pub scope: u16,
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub size: u32,
    pub elem: TypeId,
}

/// Function signature: parameter declarations plus return type.
#[derive(Debug, Clone)]
pub struct FnSigType {
    pub parms: Vec<DeclId>,
    pub rettype: TypeId,
}

#[derive(Debug, Clone)]
pub struct PathType {
    pub name: Name,
    pub decl: Option<DeclId>,
}

impl TypeNode {
    pub fn tag(&self) -> TypeTag {
        match self.kind {
            TypeKind::Void => TypeTag::Void,
            TypeKind::Prim(_) => TypeTag::Prim,
            TypeKind::Ref(_) => TypeTag::Ref,
            TypeKind::Ptr(_) => TypeTag::Ptr,
            TypeKind::Array(_) => TypeTag::Array,
            TypeKind::FnSig(_) => TypeTag::FnSig,
            TypeKind::Struct(_) => TypeTag::Struct,
            TypeKind::Tuple(_) => TypeTag::Tuple,
            TypeKind::Path(_) => TypeTag::Path,
        }
    }

    pub fn as_fn_sig(&self) -> Option<&FnSigType> {
        match &self.kind {
            TypeKind::FnSig(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn expect_fn_sig(&self) -> &FnSigType {
        self.as_fn_sig().expect("expected a function signature type")
    }

    pub fn as_ref_type(&self) -> Option<&RefType> {
        match &self.kind {
            TypeKind::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathType> {
        match &self.kind {
            TypeKind::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_path_mut(&mut self) -> Option<&mut PathType> {
        match &mut self.kind {
            TypeKind::Path(p) => Some(p),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Expression nodes
// ---------------------------------------------------------------------------

/// Tag of an expression node, for dispatch without borrowing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExprTag {
    ULit,
    FLit,
    NameUse,
    FnCall,
    FieldAccess,
    Borrow,
    Deref,
    CopyVal,
    Block,
    While,
    Assign,
    Return,
    DeclStmt,
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub span: Span,
    /// Value-type slot, filled by the type-check pass. Present after that
    /// pass iff no fatal typing error was reported for this subtree.
    pub vtype: Option<TypeId>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    ULit { value: u64, prim: PrimType },
    FLit { value: f64, prim: PrimType },
    NameUse(NameUse),
    FnCall(FnCall),
    /// Lowered property access: object plus resolved member name-use.
    FieldAccess(FieldAccess),
    Borrow(Borrow),
    Deref { exp: ExprId },
    /// Explicit value copy inserted by argument copy handling.
    CopyVal { exp: ExprId },
    Block(BlockExpr),
    While(WhileExpr),
    Assign(AssignExpr),
    Return(ReturnExpr),
    /// A local declaration in statement position.
    DeclStmt(DeclId),
}

/// How a name use has been classified by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameUseForm {
    /// Straight from the parser, not yet bound.
    Unresolved,
    /// Bound to a variable or function declaration.
    Var,
    /// Bound to a type declaration.
    Type,
    /// A member name inside a method-call or property position.
    Member,
}

/// Which module a qualifier list starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualBase {
    Root,
    Current,
}

/// Module qualifiers on a name use, e.g. `geo::shapes::Point`.
#[derive(Debug, Clone)]
pub struct QualPath {
    pub base: QualBase,
    pub names: SmallVec<[Name; 4]>,
}

#[derive(Debug, Clone)]
pub struct NameUse {
    pub name: Name,
    pub quals: Option<QualPath>,
    pub decl: Option<DeclId>,
    pub form: NameUseForm,
}

/// Function, method, operator or indexing call before lowering; a direct
/// function call after.
#[derive(Debug, Clone)]
pub struct FnCall {
    /// Object (for method calls) or function to call.
    pub objfn: ExprId,
    /// Member name-use of the method/property, or `None`.
    pub methprop: Option<ExprId>,
    /// Arguments, or `None` when the parser saw no argument list.
    pub args: Option<Vec<ExprId>>,
}

#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub obj: ExprId,
    pub member: ExprId,
}

#[derive(Debug, Clone)]
pub struct Borrow {
    pub exp: ExprId,
    pub perm: Perm,
}

#[derive(Debug, Clone, Default)]
pub struct BlockExpr {
    pub stmts: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct WhileExpr {
    pub cond: ExprId,
    pub body: ExprId,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub lval: ExprId,
    pub rval: ExprId,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnExpr {
    pub exps: Vec<ExprId>,
}

impl ExprNode {
    pub fn tag(&self) -> ExprTag {
        match self.kind {
            ExprKind::ULit { .. } => ExprTag::ULit,
            ExprKind::FLit { .. } => ExprTag::FLit,
            ExprKind::NameUse(_) => ExprTag::NameUse,
            ExprKind::FnCall(_) => ExprTag::FnCall,
            ExprKind::FieldAccess(_) => ExprTag::FieldAccess,
            ExprKind::Borrow(_) => ExprTag::Borrow,
            ExprKind::Deref { .. } => ExprTag::Deref,
            ExprKind::CopyVal { .. } => ExprTag::CopyVal,
            ExprKind::Block(_) => ExprTag::Block,
            ExprKind::While(_) => ExprTag::While,
            ExprKind::Assign(_) => ExprTag::Assign,
            ExprKind::Return(_) => ExprTag::Return,
            ExprKind::DeclStmt(_) => ExprTag::DeclStmt,
        }
    }

    pub fn as_name_use(&self) -> Option<&NameUse> {
        match &self.kind {
            ExprKind::NameUse(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_name_use_mut(&mut self) -> Option<&mut NameUse> {
        match &mut self.kind {
            ExprKind::NameUse(n) => Some(n),
            _ => None,
        }
    }

    pub fn expect_name_use(&self) -> &NameUse {
        self.as_name_use().expect("expected a name-use node")
    }

    pub fn expect_name_use_mut(&mut self) -> &mut NameUse {
        self.as_name_use_mut().expect("expected a name-use node")
    }

    pub fn as_fn_call(&self) -> Option<&FnCall> {
        match &self.kind {
            ExprKind::FnCall(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_fn_call_mut(&mut self) -> Option<&mut FnCall> {
        match &mut self.kind {
            ExprKind::FnCall(c) => Some(c),
            _ => None,
        }
    }

    pub fn expect_fn_call(&self) -> &FnCall {
        self.as_fn_call().expect("expected a call node")
    }

    pub fn expect_fn_call_mut(&mut self) -> &mut FnCall {
        self.as_fn_call_mut().expect("expected a call node")
    }

    pub fn as_field_access(&self) -> Option<&FieldAccess> {
        match &self.kind {
            ExprKind::FieldAccess(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockExpr> {
        match &self.kind {
            ExprKind::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_name_use(&self) -> bool {
        matches!(self.kind, ExprKind::NameUse(_))
    }

    pub fn is_fn_call(&self) -> bool {
        matches!(self.kind, ExprKind::FnCall(_))
    }
}
