//! Per-file source transformation.
//!
//! `.jsx`/`.tsx` get JSX lowered, `.ts`/`.tsx` get types erased, `.js` is
//! validated and only rewritten when it contains JSX. Stylesheets and other
//! assets pass through untouched.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_transformer::{JsxOptions, TransformOptions, Transformer};
use serde::Serialize;
use tracing::debug;

use crate::error::SyntaxError;
use crate::jsx_lowerer::{JsxLowerer, JSX_RUNTIME_IMPORT};
use crate::parse::{self, source_type_for};
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    /// Executable JavaScript module.
    Script,
    /// CSS to be inlined into the document.
    Stylesheet,
    /// JSON wrapped as `export default`.
    Json,
    /// Anything else, returned verbatim.
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub kind: OutputKind,
}

impl TransformOutput {
    fn new(code: String, kind: OutputKind) -> Self {
        Self { code, kind }
    }
}

/// Transforms one file. Pure: the same input always gives the same output.
pub fn transform_source(file_path: &str, source: &str) -> Result<TransformOutput, SyntaxError> {
    if path::is_stylesheet(file_path) {
        return Ok(TransformOutput::new(source.to_string(), OutputKind::Stylesheet));
    }
    if path::extension(file_path).as_deref() == Some("json") {
        return transform_json(file_path, source)
            .map(|code| TransformOutput::new(code, OutputKind::Json));
    }
    if !path::is_script(file_path) {
        return Ok(TransformOutput::new(source.to_string(), OutputKind::Asset));
    }
    transform_script(file_path, source)
        .map(|code| TransformOutput::new(code, OutputKind::Script))
}

fn transform_json(file_path: &str, source: &str) -> Result<String, SyntaxError> {
    let value: serde_json::Value = serde_json::from_str(source).map_err(|err| {
        let line = err.line().max(1) as u32;
        let column = err.column().max(1) as u32;
        SyntaxError {
            path: file_path.to_string(),
            line,
            column,
            message: err.to_string(),
            frame: Some(parse::code_frame(source, line, column)),
        }
    })?;
    Ok(format!("export default {};\n", value))
}

fn transform_script(file_path: &str, source: &str) -> Result<String, SyntaxError> {
    let allocator = Allocator::default();
    let source_type = source_type_for(file_path);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset());
        return Err(parse::syntax_error(file_path, source, &err.message, offset));
    }
    if ret.panicked {
        return Err(parse::syntax_error(
            file_path,
            source,
            "Unrecoverable parse error",
            None,
        ));
    }

    let mut program = ret.program;

    if source_type.is_typescript() {
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let options = TransformOptions {
            jsx: JsxOptions {
                jsx_plugin: false,
                display_name_plugin: false,
                jsx_self_plugin: false,
                jsx_source_plugin: false,
                ..JsxOptions::default()
            },
            ..TransformOptions::default()
        };
        let stripped = Transformer::new(&allocator, Path::new(file_path), &options)
            .build_with_scoping(scoping, &mut program);
        if let Some(err) = stripped.errors.first() {
            let offset = err
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| label.offset());
            return Err(parse::syntax_error(file_path, source, &err.message, offset));
        }
    }

    let mut lowerer = JsxLowerer::new(&allocator);
    lowerer.visit_program(&mut program);

    if lowerer.lowered == 0 && !source_type.is_typescript() {
        return Ok(source.to_string());
    }

    debug!(path = file_path, lowered = lowerer.lowered, "transformed module");

    let code = Codegen::new().build(&program).code;
    if lowerer.lowered > 0 {
        Ok(format!("{}{}", JSX_RUNTIME_IMPORT, code))
    } else {
        Ok(code)
    }
}

#[cfg(feature = "napi")]
#[napi_derive::napi]
pub fn transform_source_native(path: String, source: String) -> napi::Result<serde_json::Value> {
    crate::logging::init_logging();
    let normalized = path::normalize_path(&path);
    let value = match transform_source(&normalized, &source) {
        Ok(output) => serde_json::to_value(output),
        Err(err) => serde_json::to_value(crate::error::BuildError::SyntaxError(err)),
    };
    value.map_err(|e| napi::Error::from_reason(e.to_string()))
}
