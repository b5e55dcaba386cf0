//! Source parsing and import scanning.
//!
//! Every module is parsed with oxc. The scanner records each import site with
//! the span of its specifier literal so the resolver can rewrite specifiers by
//! span edits instead of regenerating code.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Expression, ExportAllDeclaration, ExportNamedDeclaration, ImportDeclaration,
    ImportDeclarationSpecifier, ImportExpression, ModuleExportName,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::Serialize;

use crate::error::SyntaxError;
use crate::path;

/// Maximum number of source lines shown around an error location.
const FRAME_CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    /// `import x from "y"`
    Static,
    /// `export { x } from "y"` / `export * from "y"`
    ReExport,
    /// `import "y"`
    SideEffect,
    /// `import("y")` with a literal argument.
    Dynamic,
}

/// One name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBinding {
    /// Exported name; `None` for namespace imports, `Some("default")` for defaults.
    pub imported: Option<String>,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSite {
    pub specifier: String,
    /// Byte range of the specifier literal, quotes included.
    pub literal_span: (u32, u32),
    /// Byte range of the whole statement (or call expression for dynamic imports).
    pub statement_span: (u32, u32),
    pub kind: ImportKind,
    /// `import type` / `export type`; erased by the TypeScript strip.
    pub type_only: bool,
    pub bindings: Vec<ImportBinding>,
    /// Names requested through `export { a, b } from` re-exports.
    pub reexported: Vec<String>,
    /// Re-exported bindings: `imported` is the source name (`None` for
    /// `export * as ns`), `local` the name this module exports it as.
    pub reexport_bindings: Vec<ImportBinding>,
}

impl ImportSite {
    /// Sites that load code at runtime and participate in graph discovery.
    pub fn is_static_dependency(&self) -> bool {
        !self.type_only && self.kind != ImportKind::Dynamic
    }

    /// Names the target module must export for this site to link.
    pub fn requested_names(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter_map(|binding| binding.imported.as_deref())
            .chain(self.reexported.iter().map(String::as_str))
    }
}

/// Source type used to parse a file with the given path.
pub fn source_type_for(path: &str) -> SourceType {
    let ext = path::extension(path);
    let typescript = matches!(ext.as_deref(), Some("ts" | "mts" | "tsx"));
    let jsx = matches!(ext.as_deref(), Some("jsx" | "tsx" | "js" | "mjs"));
    SourceType::default()
        .with_module(true)
        .with_typescript(typescript)
        .with_jsx(jsx)
}

fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

#[derive(Default)]
struct ImportCollector {
    sites: Vec<ImportSite>,
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let mut bindings = Vec::new();
        if let Some(specifiers) = &decl.specifiers {
            for specifier in specifiers {
                match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                        if spec.import_kind.is_type() {
                            continue;
                        }
                        bindings.push(ImportBinding {
                            imported: Some(module_export_name(&spec.imported)),
                            local: spec.local.name.to_string(),
                        });
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                        bindings.push(ImportBinding {
                            imported: Some("default".to_string()),
                            local: spec.local.name.to_string(),
                        });
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                        bindings.push(ImportBinding {
                            imported: None,
                            local: spec.local.name.to_string(),
                        });
                    }
                }
            }
        }

        let kind = if decl.specifiers.is_none() {
            ImportKind::SideEffect
        } else {
            ImportKind::Static
        };
        self.sites.push(ImportSite {
            specifier: decl.source.value.to_string(),
            literal_span: (decl.source.span.start, decl.source.span.end),
            statement_span: (decl.span.start, decl.span.end),
            kind,
            type_only: decl.import_kind.is_type(),
            bindings,
            reexported: Vec::new(),
            reexport_bindings: Vec::new(),
        });
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            let reexport_bindings: Vec<ImportBinding> = decl
                .specifiers
                .iter()
                .filter(|spec| !spec.export_kind.is_type())
                .map(|spec| ImportBinding {
                    imported: Some(module_export_name(&spec.local)),
                    local: module_export_name(&spec.exported),
                })
                .collect();
            let reexported = reexport_bindings
                .iter()
                .filter_map(|binding| binding.imported.clone())
                .collect();
            self.sites.push(ImportSite {
                specifier: source.value.to_string(),
                literal_span: (source.span.start, source.span.end),
                statement_span: (decl.span.start, decl.span.end),
                kind: ImportKind::ReExport,
                type_only: decl.export_kind.is_type(),
                bindings: Vec::new(),
                reexported,
                reexport_bindings,
            });
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        let reexport_bindings = decl
            .exported
            .iter()
            .map(|name| ImportBinding {
                imported: None,
                local: module_export_name(name),
            })
            .collect();
        self.sites.push(ImportSite {
            specifier: decl.source.value.to_string(),
            literal_span: (decl.source.span.start, decl.source.span.end),
            statement_span: (decl.span.start, decl.span.end),
            kind: ImportKind::ReExport,
            type_only: decl.export_kind.is_type(),
            bindings: Vec::new(),
            reexported: Vec::new(),
            reexport_bindings,
        });
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(lit) = &expr.source {
            self.sites.push(ImportSite {
                specifier: lit.value.to_string(),
                literal_span: (lit.span.start, lit.span.end),
                statement_span: (expr.span.start, expr.span.end),
                kind: ImportKind::Dynamic,
                type_only: false,
                bindings: Vec::new(),
                reexported: Vec::new(),
                reexport_bindings: Vec::new(),
            });
        }
        walk::walk_import_expression(self, expr);
    }
}

/// Parses `source` and lists its import sites in source order.
pub fn scan_imports(path: &str, source: &str) -> Result<Vec<ImportSite>, SyntaxError> {
    scan_imports_as(path, source, source_type_for(path))
}

/// Scans already-transformed output, which is always plain JavaScript.
pub fn scan_script(path: &str, code: &str) -> Result<Vec<ImportSite>, SyntaxError> {
    scan_imports_as(path, code, SourceType::default().with_module(true))
}

fn scan_imports_as(
    path: &str,
    source: &str,
    source_type: SourceType,
) -> Result<Vec<ImportSite>, SyntaxError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset());
        return Err(syntax_error(path, source, &err.message, offset));
    }
    if ret.panicked {
        return Err(syntax_error(path, source, "Unrecoverable parse error", None));
    }

    let mut collector = ImportCollector::default();
    collector.visit_program(&ret.program);
    collector.sites.sort_by_key(|site| site.literal_span.0);
    Ok(collector.sites)
}

/// Builds a [`SyntaxError`] for a byte offset into `source`.
pub fn syntax_error(path: &str, source: &str, message: &str, offset: Option<usize>) -> SyntaxError {
    let (line, column) = offset
        .map(|offset| line_column(source, offset))
        .unwrap_or((1, 1));
    SyntaxError {
        path: path.to_string(),
        line,
        column,
        message: message.to_string(),
        frame: offset.map(|_| code_frame(source, line, column)),
    }
}

/// 1-based line and column of a byte offset. Columns count characters.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let column = source[line_start..offset].chars().count() + 1;
    (line as u32, column as u32)
}

/// A few numbered lines around `line` with a caret under `column`.
pub fn code_frame(source: &str, line: u32, column: u32) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let target = line as usize;
    let first = target.saturating_sub(FRAME_CONTEXT_LINES).max(1);
    let last = (target + FRAME_CONTEXT_LINES).min(lines.len().max(1));
    let width = last.to_string().len();

    let mut frame = String::new();
    for number in first..=last {
        let text = lines.get(number - 1).copied().unwrap_or("");
        let marker = if number == target { '>' } else { ' ' };
        frame.push_str(&format!("{} {:>width$} | {}\n", marker, number, text, width = width));
        if number == target {
            frame.push_str(&format!(
                "  {:>width$} | {}^\n",
                "",
                " ".repeat(column.saturating_sub(1) as usize),
                width = width
            ));
        }
    }
    frame.trim_end().to_string()
}

/// Applies byte-range replacements to `source`. Ranges must not overlap.
pub fn apply_edits(source: &str, mut edits: Vec<(u32, u32, String)>) -> String {
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    let mut result = source.to_string();
    for (start, end, replacement) in edits {
        result.replace_range((start as usize)..(end as usize), &replacement);
    }
    result
}

/// Quotes `value` as a JavaScript string literal.
pub fn quote_js(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_static_imports() {
        let code = r#"
import React, { useState as useS } from "react";
import * as utils from "./utils";
import "./styles.css";
import type { Props } from "./types";
export { Button } from "@/components/Button";
export * from "./all";
"#;
        let sites = scan_imports("/App.tsx", code).unwrap();
        let specs: Vec<&str> = sites.iter().map(|s| s.specifier.as_str()).collect();
        assert_eq!(
            specs,
            vec!["react", "./utils", "./styles.css", "./types", "@/components/Button", "./all"]
        );

        assert_eq!(sites[0].kind, ImportKind::Static);
        assert_eq!(
            sites[0].bindings,
            vec![
                ImportBinding {
                    imported: Some("default".to_string()),
                    local: "React".to_string()
                },
                ImportBinding {
                    imported: Some("useState".to_string()),
                    local: "useS".to_string()
                },
            ]
        );
        assert_eq!(sites[1].bindings[0].imported, None);
        assert_eq!(sites[2].kind, ImportKind::SideEffect);
        assert!(sites[3].type_only);
        assert!(!sites[3].is_static_dependency());
        assert_eq!(sites[4].kind, ImportKind::ReExport);
        assert_eq!(sites[4].reexported, vec!["Button".to_string()]);
        assert!(sites[5].reexport_bindings.is_empty());
    }

    #[test]
    fn test_reexport_bindings_keep_aliases() {
        let code = "export { default as styles, card } from './a.css';\n\
                    export * as theme from './t.css';";
        let sites = scan_imports("/a.js", code).unwrap();
        assert_eq!(
            sites[0].reexport_bindings,
            vec![
                ImportBinding {
                    imported: Some("default".to_string()),
                    local: "styles".to_string()
                },
                ImportBinding {
                    imported: Some("card".to_string()),
                    local: "card".to_string()
                },
            ]
        );
        assert_eq!(
            sites[0].reexported,
            vec!["default".to_string(), "card".to_string()]
        );
        assert_eq!(
            sites[1].reexport_bindings,
            vec![ImportBinding {
                imported: None,
                local: "theme".to_string()
            }]
        );
    }

    #[test]
    fn test_literal_span_includes_quotes() {
        let code = "import x from './x';";
        let sites = scan_imports("/a.js", code).unwrap();
        let (start, end) = sites[0].literal_span;
        assert_eq!(&code[start as usize..end as usize], "'./x'");
    }

    #[test]
    fn test_dynamic_imports_only_literal() {
        let code = "const a = () => import('./Lazy'); const b = (p) => import(p);";
        let sites = scan_imports("/a.js", code).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].kind, ImportKind::Dynamic);
        assert!(!sites[0].is_static_dependency());
    }

    #[test]
    fn test_scan_reports_location() {
        let code = "export default function App() {\n  return <div>;\n}\n";
        let err = scan_imports("/App.jsx", code).unwrap_err();
        assert_eq!(err.path, "/App.jsx");
        assert!(err.line >= 2);
        assert!(err.frame.is_some());
    }

    #[test]
    fn test_line_column() {
        let source = "ab\ncd\nef";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 4), (2, 2));
        assert_eq!(line_column(source, 100), (3, 3));
    }

    #[test]
    fn test_code_frame_marks_line() {
        let frame = code_frame("one\ntwo\nthree", 2, 3);
        assert!(frame.contains("> 2 | two"));
        assert!(frame.contains("|   ^"));
    }

    #[test]
    fn test_apply_edits_reverse_order() {
        let out = apply_edits(
            "import a from './a'; import b from './b';",
            vec![(14, 19, "\"A\"".to_string()), (35, 40, "\"B\"".to_string())],
        );
        assert_eq!(out, "import a from \"A\"; import b from \"B\";");
    }
}
