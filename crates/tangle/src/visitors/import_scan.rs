//! Import scanner that finds every import statement in a module, tracking
//! whether it sits at module scope or inside a function body.
//!
//! Class bodies do not open a new laziness scope: a class-body import runs at
//! class-definition time, i.e. at module import time. Only imports nested in
//! a function or method body count as lazy.

use ruff_python_ast::{
    Stmt, StmtImport, StmtImportFrom,
    visitor::{Visitor, walk_stmt},
};

use super::LineIndex;

/// One import statement as written in source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// Dotted module path, `None` for `from . import x` style imports.
    pub module: Option<String>,
    /// Named members for from-imports; empty for plain `import` statements.
    pub members: Vec<String>,
    /// Leading-dot count for relative imports.
    pub level: u32,
    /// 1-based source line.
    pub line: usize,
    /// Innermost enclosing function name, if the import is lazy.
    pub enclosing_function: Option<String>,
}

pub struct ImportScanVisitor<'a> {
    imports: Vec<RawImport>,
    function_stack: Vec<String>,
    line_index: &'a LineIndex,
}

impl std::fmt::Debug for ImportScanVisitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportScanVisitor")
            .field("imports", &self.imports.len())
            .finish()
    }
}

impl<'a> ImportScanVisitor<'a> {
    pub fn new(line_index: &'a LineIndex) -> Self {
        Self {
            imports: Vec::new(),
            function_stack: Vec::new(),
            line_index,
        }
    }

    pub fn into_imports(self) -> Vec<RawImport> {
        self.imports
    }

    fn record_import(&mut self, stmt: &StmtImport) {
        for alias in &stmt.names {
            self.imports.push(RawImport {
                module: Some(alias.name.to_string()),
                members: Vec::new(),
                level: 0,
                line: self.line_index.line(stmt.range.start()),
                enclosing_function: self.function_stack.last().cloned(),
            });
        }
    }

    fn record_import_from(&mut self, stmt: &StmtImportFrom) {
        let members = stmt
            .names
            .iter()
            .map(|alias| alias.name.to_string())
            .filter(|name| name != "*")
            .collect();
        self.imports.push(RawImport {
            module: stmt.module.as_ref().map(|m| m.to_string()),
            members,
            level: stmt.level,
            line: self.line_index.line(stmt.range.start()),
            enclosing_function: self.function_stack.last().cloned(),
        });
    }
}

impl<'a> Visitor<'a> for ImportScanVisitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(import) => self.record_import(import),
            Stmt::ImportFrom(import_from) => self.record_import_from(import_from),
            Stmt::FunctionDef(func) => {
                self.function_stack.push(func.name.to_string());
                walk_stmt(self, stmt);
                self.function_stack.pop();
                return;
            }
            // Class bodies execute at definition time; no scope push.
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}
