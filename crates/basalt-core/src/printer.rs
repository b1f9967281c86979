//! Textual IR dump.
//!
//! Renders the (possibly resolved) tree for debugging and for the front
//! end's `--print-ir` flag. [`dump`] writes the conventional `program.ast`
//! file; the output is a debugging aid, not part of the compilation
//! contract.

use std::io::Write;
use std::path::Path;

use crate::arena::NodeArena;
use crate::ir::{DeclId, DeclKind, ExprId, ExprKind, TypeId, TypeKind};
use crate::names::NameTable;

pub struct IrPrinter<'a> {
    arena: &'a NodeArena,
    names: &'a NameTable,
    out: String,
    indent: usize,
}

/// Render the tree rooted at a module to a string.
pub fn render(arena: &NodeArena, names: &NameTable, root: DeclId) -> String {
    let mut printer = IrPrinter {
        arena,
        names,
        out: String::new(),
        indent: 0,
    };
    printer.print_decl(root);
    printer.out
}

/// Write the rendered tree to `program.ast` (or any other path).
pub fn dump(
    arena: &NodeArena,
    names: &NameTable,
    root: DeclId,
    path: impl AsRef<Path>,
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(render(arena, names, root).as_bytes())
}

impl<'a> IrPrinter<'a> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn print_decl(&mut self, id: DeclId) {
        enum Body {
            Children(Vec<DeclId>),
            Expr(Option<ExprId>),
            Leaf,
        }
        let (header, body) = {
            let decl = self.arena.decl(id);
            let name = self.names.as_str(decl.name);
            match &decl.kind {
                DeclKind::Module(module) => {
                    let header = if name.is_empty() {
                        "module".to_string()
                    } else {
                        format!("module {}", name)
                    };
                    (header, Body::Children(module.nodes.clone()))
                }
                DeclKind::Struct(strct) => (
                    format!("struct {}", name),
                    Body::Children(strct.methprops.nodes.clone()),
                ),
                DeclKind::Fn(f) => {
                    let sig = decl
                        .vtype
                        .map(|t| self.type_text(t))
                        .unwrap_or_else(|| "?".to_string());
                    let kw = if decl.is_meth_prop() { "method" } else { "fn" };
                    (format!("{} {} {}", kw, name, sig), Body::Expr(f.body))
                }
                DeclKind::Var(var) => {
                    let kw = if decl.is_meth_prop() { "prop" } else { "var" };
                    let ty = decl
                        .vtype
                        .map(|t| self.type_text(t))
                        .unwrap_or_else(|| "?".to_string());
                    let header = match var.value {
                        Some(value) => format!(
                            "{} {} {} {} = {}",
                            kw,
                            name,
                            var.perm,
                            ty,
                            self.expr_text(value)
                        ),
                        None => format!("{} {} {} {}", kw, name, var.perm, ty),
                    };
                    (header, Body::Leaf)
                }
            }
        };

        self.line(&header);
        match body {
            Body::Children(children) => {
                self.indent += 1;
                for child in children {
                    self.print_decl(child);
                }
                self.indent -= 1;
            }
            Body::Expr(Some(body)) => {
                self.indent += 1;
                self.print_expr(body);
                self.indent -= 1;
            }
            Body::Expr(None) | Body::Leaf => {}
        }
    }

    fn print_expr(&mut self, id: ExprId) {
        enum Shape {
            Block(Vec<ExprId>),
            While(String, ExprId),
            Decl(DeclId),
            Inline(String),
        }
        let shape = match &self.arena.expr(id).kind {
            ExprKind::Block(block) => Shape::Block(block.stmts.clone()),
            ExprKind::While(w) => Shape::While(self.expr_text(w.cond), w.body),
            ExprKind::DeclStmt(decl) => Shape::Decl(*decl),
            _ => Shape::Inline(self.expr_text(id)),
        };
        match shape {
            Shape::Block(stmts) => {
                self.line("block");
                self.indent += 1;
                for stmt in stmts {
                    self.print_expr(stmt);
                }
                self.indent -= 1;
            }
            Shape::While(cond, body) => {
                self.line(&format!("while {}", cond));
                self.indent += 1;
                self.print_expr(body);
                self.indent -= 1;
            }
            Shape::Decl(decl) => self.print_decl(decl),
            Shape::Inline(text) => self.line(&text),
        }
    }

    fn expr_text(&self, id: ExprId) -> String {
        let node = self.arena.expr(id);
        match &node.kind {
            ExprKind::ULit { value, .. } => format!("{}", value),
            ExprKind::FLit { value, .. } => format!("{}", value),
            ExprKind::NameUse(name) => {
                let mut text = String::new();
                if let Some(quals) = &name.quals {
                    for qual in &quals.names {
                        text.push_str(self.names.as_str(*qual));
                        text.push_str("::");
                    }
                }
                text.push_str(self.names.as_str(name.name));
                text
            }
            ExprKind::FnCall(call) => {
                let mut text = self.expr_text(call.objfn);
                if let Some(methprop) = call.methprop {
                    text.push('.');
                    text.push_str(&self.expr_text(methprop));
                }
                if let Some(args) = &call.args {
                    text.push('(');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            text.push_str(", ");
                        }
                        text.push_str(&self.expr_text(*arg));
                    }
                    text.push(')');
                }
                text
            }
            ExprKind::FieldAccess(f) => {
                format!("{}.{}", self.expr_text(f.obj), self.expr_text(f.member))
            }
            ExprKind::Borrow(b) => format!("&{} {}", b.perm, self.expr_text(b.exp)),
            ExprKind::Deref { exp } => format!("*{}", self.expr_text(*exp)),
            ExprKind::CopyVal { exp } => format!("copy {}", self.expr_text(*exp)),
            ExprKind::Assign(a) => {
                format!("{} = {}", self.expr_text(a.lval), self.expr_text(a.rval))
            }
            ExprKind::Return(r) => {
                let exps: Vec<String> = r.exps.iter().map(|e| self.expr_text(*e)).collect();
                format!("return {}", exps.join(", "))
            }
            ExprKind::Block(_) => "block".to_string(),
            ExprKind::While(w) => format!("while {}", self.expr_text(w.cond)),
            ExprKind::DeclStmt(decl) => {
                format!("var {}", self.names.as_str(self.arena.decl(*decl).name))
            }
        }
    }

    fn type_text(&self, id: TypeId) -> String {
        match &self.arena.ty(id).kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Prim(p) => p.to_string(),
            TypeKind::Ref(r) => {
                let head = if r.array_ref { "&[]" } else { "&" };
                format!("{}{} {}", head, r.perm, self.type_text(r.pvtype))
            }
            TypeKind::Ptr(p) => format!("*{} {}", p.perm, self.type_text(p.pvtype)),
            TypeKind::Array(a) => format!("[{}]{}", a.size, self.type_text(a.elem)),
            TypeKind::FnSig(sig) => {
                let parms: Vec<String> = sig
                    .parms
                    .iter()
                    .map(|p| {
                        let decl = self.arena.decl(*p);
                        let ty = decl
                            .vtype
                            .map(|t| self.type_text(t))
                            .unwrap_or_else(|| "?".to_string());
                        format!("{} {}", self.names.as_str(decl.name), ty)
                    })
                    .collect();
                format!("({}) {}", parms.join(", "), self.type_text(sig.rettype))
            }
            TypeKind::Struct(decl) => self.names.as_str(self.arena.decl(*decl).name).to_string(),
            TypeKind::Tuple(elems) => {
                let elems: Vec<String> = elems.iter().map(|e| self.type_text(*e)).collect();
                elems.join(", ")
            }
            TypeKind::Path(path) => self.names.as_str(path.name).to_string(),
        }
    }
}
