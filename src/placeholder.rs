//! Placeholder modules for imports that cannot be resolved.
//!
//! A placeholder is a valid ES module that exports a component rendering
//! nothing, under the default export and under every name an importer asked
//! for, so a missing file never breaks linking.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::parse::quote_js;

/// `data:` URL for an ES module with the given body.
pub fn module_data_url(code: &str) -> String {
    format!("data:text/javascript;base64,{}", STANDARD.encode(code.as_bytes()))
}

pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Source of a placeholder exporting `names` besides `default`.
pub fn placeholder_source(names: &BTreeSet<String>) -> String {
    let mut code = String::from(
        "function Placeholder() { return null; }\nexport default Placeholder;\n",
    );
    let exported: Vec<String> = names
        .iter()
        .filter(|name| name.as_str() != "default" && !name.is_empty())
        .map(|name| {
            if is_plain_identifier(name) {
                format!("Placeholder as {}", name)
            } else {
                format!("Placeholder as {}", quote_js(name))
            }
        })
        .collect();
    if !exported.is_empty() {
        code.push_str(&format!("export {{ {} }};\n", exported.join(", ")));
    }
    code
}

/// `data:` URL of a placeholder exporting `names`.
pub fn placeholder_url(names: &BTreeSet<String>) -> String {
    module_data_url(&placeholder_source(names))
}
