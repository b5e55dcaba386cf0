//! # Preview Document Assembly
//!
//! Turns a resolved [`ModuleGraph`] into one self-contained HTML document, or
//! renders a build failure as a document of its own.
//!
//! ## Key Invariants
//!
//! 1. **Always HTML**: every build outcome renders as a complete document
//! 2. **No boot on failure**: error documents contain no `<script>` elements
//! 3. **Escaped embedding**: user text is HTML-escaped; script and style bodies
//!    cannot terminate their element early
//! 4. **Sandboxed**: the host frame gets `allow-scripts allow-same-origin allow-forms`
//!    and nothing else

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::BuildConfig;
use crate::error::{BuildError, SyntaxError};
use crate::parse::quote_js;
use crate::resolver::ModuleGraph;

/// Permissions granted to the preview iframe. No top navigation, no popups.
pub const SANDBOX_PERMISSIONS: [&str; 3] = ["allow-scripts", "allow-same-origin", "allow-forms"];

lazy_static! {
    static ref STYLE_CLOSE_RE: Regex = Regex::new(r"(?i)</style").unwrap();
}

const BOOT_TEMPLATE: &str = r#"import * as React from "react";
import { createRoot } from "react-dom/client";

const rootElement = document.getElementById(__ROOT_ID__);

function showError(title, error) {
  const message = error && error.message ? error.message : String(error);
  const stack = error && error.stack ? String(error.stack) : "";
  const panel = document.createElement("div");
  panel.setAttribute("role", "alert");
  panel.className = "preview-error";
  const heading = document.createElement("strong");
  heading.textContent = title;
  const body = document.createElement("pre");
  body.textContent = stack && !stack.includes(message) ? message + "\n\n" + stack : stack || message;
  panel.append(heading, body);
  rootElement.replaceChildren(panel);
}

window.addEventListener("error", (event) => {
  showError("Runtime error", event.error || event.message);
});
window.addEventListener("unhandledrejection", (event) => {
  showError("Unhandled promise rejection", event.reason);
});

class PreviewErrorBoundary extends React.Component {
  constructor(props) {
    super(props);
    this.state = { error: null };
  }
  static getDerivedStateFromError(error) {
    return { error };
  }
  componentDidCatch(error, info) {
    console.error(error, info && info.componentStack);
  }
  render() {
    const error = this.state.error;
    if (!error) {
      return this.props.children;
    }
    return React.createElement(
      "div",
      { role: "alert", className: "preview-error" },
      React.createElement("strong", null, "Render error"),
      React.createElement("pre", null, String((error && error.stack) || error))
    );
  }
}

try {
  const mod = await import(__ENTRY__);
  const App = mod.default ?? Object.values(mod).find((value) => typeof value === "function");
  if (!App) {
    throw new Error(__ENTRY_PATH__ + " does not export a component");
  }
  createRoot(rootElement).render(
    React.createElement(PreviewErrorBoundary, null, React.createElement(App))
  );
} catch (error) {
  showError("Failed to load preview", error);
}
"#;

const BASE_STYLE: &str = r#".preview-error { margin: 16px; padding: 16px; border: 1px solid #fca5a5; border-radius: 8px; background: #fef2f2; color: #991b1b; font-family: ui-sans-serif, system-ui, sans-serif; }
.preview-error pre { margin: 8px 0 0; white-space: pre-wrap; font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 12px; }"#;

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}

/// Makes text safe inside a `<script>` body. `<\/` is equivalent to `</` in
/// JavaScript strings and JSON.
fn escape_script(text: &str) -> String {
    text.replace("</", "<\\/")
}

fn escape_style(text: &str) -> String {
    STYLE_CLOSE_RE.replace_all(text, "<\\/style").into_owned()
}

/// Value of the iframe `sandbox` attribute.
pub fn sandbox_attribute() -> String {
    SANDBOX_PERMISSIONS.join(" ")
}

/// A sandboxed iframe rendering `html` through `srcdoc`.
pub fn iframe_markup(html: &str, title: &str) -> String {
    format!(
        "<iframe title=\"{}\" sandbox=\"{}\" srcdoc=\"{}\"></iframe>",
        html_escape(title),
        sandbox_attribute(),
        html_escape(html)
    )
}

fn head_open(title: &str) -> String {
    let mut head = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    head.push_str("<meta charset=\"utf-8\" />\n");
    head.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    head.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    head.push_str(&format!("<style>\n{}\n</style>\n", BASE_STYLE));
    head
}

fn boot_script(graph: &ModuleGraph, config: &BuildConfig) -> String {
    BOOT_TEMPLATE
        .replace("__ROOT_ID__", &quote_js(&config.root_element_id))
        .replace("__ENTRY__", &quote_js(&graph.entry_key()))
        .replace("__ENTRY_PATH__", &quote_js(&graph.entry))
}

/// Renders a successful build.
pub fn render_document(graph: &ModuleGraph, config: &BuildConfig) -> String {
    let mut html = head_open(&config.title);

    if config.tailwind {
        html.push_str(&format!(
            "<script src=\"{}\"></script>\n",
            html_escape(&config.tailwind_url)
        ));
    }
    for url in &graph.external_stylesheets {
        html.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{}\" />\n",
            html_escape(url)
        ));
    }
    if !graph.stylesheets.is_empty() {
        html.push_str("<style>\n");
        for sheet in &graph.stylesheets {
            html.push_str(&format!(
                "/* {} */\n{}\n",
                escape_style(&sheet.path.replace("*/", "* /")),
                escape_style(&sheet.content)
            ));
        }
        html.push_str("</style>\n");
    }
    html.push_str(&format!(
        "<script type=\"importmap\">\n{}\n</script>\n",
        escape_script(&graph.import_map.to_json())
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!(
        "<div id=\"{}\"></div>\n",
        html_escape(&config.root_element_id)
    ));
    html.push_str(&format!(
        "<script type=\"module\">\n{}</script>\n",
        escape_script(&boot_script(graph, config))
    ));
    html.push_str("</body>\n</html>\n");
    html
}

fn error_panel(heading: &str, details: &str) -> String {
    format!(
        "<div class=\"preview-error\" role=\"alert\">\n<strong>{}</strong>\n{}</div>\n",
        html_escape(heading),
        details
    )
}

fn syntax_error_details(err: &SyntaxError) -> String {
    let mut details = format!(
        "<p><code>{}</code> line {}, column {}</p>\n<p>{}</p>\n",
        html_escape(&err.path),
        err.line,
        err.column,
        html_escape(&err.message)
    );
    if let Some(frame) = &err.frame {
        details.push_str(&format!("<pre>{}</pre>\n", html_escape(frame)));
    }
    details
}

/// Renders a failed build. The result contains no scripts.
pub fn render_error_document(error: &BuildError, config: &BuildConfig) -> String {
    let body = match error {
        BuildError::SyntaxError(err) => error_panel("Syntax error", &syntax_error_details(err)),
        BuildError::NoEntryPoint => error_panel(
            "No preview available",
            "<p>Create <code>/App.jsx</code> or another <code>.jsx</code>/<code>.tsx</code> file to render a preview.</p>\n",
        ),
    };
    let mut html = head_open(&config.title);
    html.push_str("</head>\n<body>\n");
    html.push_str(&body);
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import_map::ImportMap;
    use crate::resolver::Stylesheet;

    fn graph() -> ModuleGraph {
        let mut import_map = ImportMap::with_runtime(&BuildConfig::default());
        import_map.insert_if_absent("@/App.jsx", "data:text/javascript;base64,AAAA");
        ModuleGraph {
            entry: "/App.jsx".to_string(),
            modules: Vec::new(),
            import_map,
            stylesheets: vec![Stylesheet {
                path: "/styles.css".to_string(),
                content: "body { color: red; }".to_string(),
            }],
            external_stylesheets: vec!["https://esm.sh/katex/dist/katex.min.css".to_string()],
            unresolved: Vec::new(),
        }
    }

    #[test]
    fn test_success_document() {
        let html = render_document(&graph(), &BuildConfig::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<script type=\"importmap\">"));
        assert!(html.contains("\"@/App.jsx\""));
        assert!(html.contains("/* /styles.css */\nbody { color: red; }"));
        assert!(html.contains(
            "<link rel=\"stylesheet\" href=\"https://esm.sh/katex/dist/katex.min.css\" />"
        ));
        assert!(html.contains("<div id=\"root\"></div>"));
        assert!(html.contains("await import(\"@/App.jsx\")"));
        assert!(html.contains("unhandledrejection"));
        assert!(html.contains("cdn.tailwindcss.com"));
    }

    #[test]
    fn test_tailwind_can_be_disabled() {
        let config = BuildConfig {
            tailwind: false,
            title: "A <b>".to_string(),
            ..BuildConfig::default()
        };
        let html = render_document(&graph(), &config);
        assert!(!html.contains("tailwind"));
        assert!(html.contains("<title>A &lt;b&gt;</title>"));
    }

    #[test]
    fn test_style_close_tag_is_neutralized() {
        let mut g = graph();
        g.stylesheets[0].content = "a{}</STYLE><script>alert(1)</script>".to_string();
        let html = render_document(&g, &BuildConfig::default());
        assert!(!html.contains("</STYLE>"));
        assert_eq!(html.matches("</style>").count(), 2);
    }

    #[test]
    fn test_syntax_error_document() {
        let err = BuildError::SyntaxError(SyntaxError {
            path: "/App.jsx".to_string(),
            line: 4,
            column: 9,
            message: "Expected `</div>` but found <EOF>".to_string(),
            frame: Some("> 4 | <div>".to_string()),
        });
        let html = render_error_document(&err, &BuildConfig::default());
        assert!(html.contains("/App.jsx"));
        assert!(html.contains("line 4, column 9"));
        assert!(html.contains("Expected `&lt;/div&gt;`"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_no_entry_document() {
        let html = render_error_document(&BuildError::NoEntryPoint, &BuildConfig::default());
        assert!(html.contains("No preview available"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_iframe_markup() {
        let markup = iframe_markup("<p class=\"x\">hi</p>", "Preview");
        assert!(markup.contains("sandbox=\"allow-scripts allow-same-origin allow-forms\""));
        assert!(markup.contains("srcdoc=\"&lt;p class=&quot;x&quot;&gt;hi&lt;/p&gt;\""));
        assert!(!markup.contains("allow-top-navigation"));
        assert!(!markup.contains("allow-popups"));
    }
}
