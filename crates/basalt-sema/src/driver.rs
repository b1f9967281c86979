//! Pass driver.
//!
//! Runs name resolution, then (only on a clean run) type check, over the
//! parsed root module. A nonzero error count after either pass cancels the
//! rest of the pipeline; the caller skips code generation the same way.

use basalt_core::arena::NodeArena;
use basalt_core::ir::DeclId;
use basalt_core::names::NameTable;
use basalt_core::{Reporter, printer};

use crate::nameres::NameResolver;
use crate::typecheck::TypeChecker;

/// Options the front-end driver forwards into analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// Dump the resolved IR (the `--print-ir` flag).
    pub print_ir: bool,
}

/// Run both analysis passes. Returns `true` when the tree is fully resolved
/// and typed and may be handed to the generator.
pub fn analyze(
    arena: &mut NodeArena,
    names: &mut NameTable,
    diags: &mut Reporter,
    root: DeclId,
) -> bool {
    let depth = names.depth();

    tracing::debug!("running name resolution");
    NameResolver::new(arena, names, diags, root).run();
    debug_assert_eq!(names.depth(), depth, "name resolution left hooks behind");
    if !diags.is_clean() {
        tracing::debug!(errors = diags.error_count(), "skipping type check");
        return false;
    }

    tracing::debug!("running type check");
    TypeChecker::new(arena, names, diags, root).run();
    debug_assert_eq!(names.depth(), depth, "type check left hooks behind");

    diags.is_clean()
}

/// [`analyze`], plus the IR dump when requested. Returns the rendered IR so
/// the caller decides where it goes (stdout, `program.ast`, a log).
pub fn analyze_with(
    arena: &mut NodeArena,
    names: &mut NameTable,
    diags: &mut Reporter,
    root: DeclId,
    options: AnalysisOptions,
) -> (bool, Option<String>) {
    let ok = analyze(arena, names, diags, root);
    let rendered = (ok && options.print_ir).then(|| printer::render(arena, names, root));
    (ok, rendered)
}
