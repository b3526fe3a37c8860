//! Function and call-expression scanner for the call-graph pass.
//!
//! Collects every function and method definition (nested definitions
//! included, under their own qualified path) and the bare names called from
//! each body. A call is attributed to its innermost enclosing function, so a
//! nested function's calls never leak into the enclosing scope.

use ruff_python_ast::{
    Expr, Stmt,
    visitor::{Visitor, walk_expr, walk_stmt},
};

use super::LineIndex;

/// A function definition found in one module, before cross-module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFunction {
    /// Bare function name.
    pub bare: String,
    /// Scope path within the module, e.g. `Widget.paint` or `outer.inner`.
    pub path: String,
    /// Nearest enclosing class, if this is a method.
    pub class: Option<String>,
    /// 1-based line of the definition.
    pub line: usize,
    /// Bare names called from this function's own body.
    pub calls: Vec<String>,
}

enum ScopeElement {
    Function(String),
    Class(String),
}

pub struct FunctionScanVisitor<'a> {
    functions: Vec<ScannedFunction>,
    scope: Vec<ScopeElement>,
    /// Indices into `functions` for the currently open definitions.
    open: Vec<usize>,
    line_index: &'a LineIndex,
}

impl std::fmt::Debug for FunctionScanVisitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionScanVisitor")
            .field("functions", &self.functions.len())
            .finish()
    }
}

impl<'a> FunctionScanVisitor<'a> {
    pub fn new(line_index: &'a LineIndex) -> Self {
        Self {
            functions: Vec::new(),
            scope: Vec::new(),
            open: Vec::new(),
            line_index,
        }
    }

    pub fn into_functions(self) -> Vec<ScannedFunction> {
        self.functions
    }

    fn scope_path(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self
            .scope
            .iter()
            .map(|element| match element {
                ScopeElement::Function(n) | ScopeElement::Class(n) => n.as_str(),
            })
            .collect();
        parts.push(name);
        parts.join(".")
    }

    fn enclosing_class(&self) -> Option<String> {
        self.scope.iter().rev().find_map(|element| match element {
            ScopeElement::Class(name) => Some(name.clone()),
            ScopeElement::Function(_) => None,
        })
    }

    /// Bare callee name for a call expression: `f(...)` or `obj.method(...)`.
    fn callee_name(func: &Expr) -> Option<String> {
        match func {
            Expr::Name(name) => Some(name.id.to_string()),
            Expr::Attribute(attr) => Some(attr.attr.to_string()),
            _ => None,
        }
    }
}

impl<'a> Visitor<'a> for FunctionScanVisitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(func) => {
                let name = func.name.to_string();
                self.functions.push(ScannedFunction {
                    bare: name.clone(),
                    path: self.scope_path(&name),
                    class: self.enclosing_class(),
                    line: self.line_index.line(func.range.start()),
                    calls: Vec::new(),
                });
                self.open.push(self.functions.len() - 1);
                self.scope.push(ScopeElement::Function(name));
                walk_stmt(self, stmt);
                self.scope.pop();
                self.open.pop();
            }
            Stmt::ClassDef(class) => {
                self.scope.push(ScopeElement::Class(class.name.to_string()));
                walk_stmt(self, stmt);
                self.scope.pop();
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        if let Expr::Call(call) = expr
            && let Some(name) = Self::callee_name(&call.func)
            && let Some(&current) = self.open.last()
        {
            self.functions[current].calls.push(name);
        }
        walk_expr(self, expr);
    }
}
