//! # In-memory Component Preview Compiler
//!
//! Builds a runnable, sandboxed HTML preview from a set of virtual source
//! files without a filesystem or a bundler.
//!
//! ## Pipeline
//!
//! 1. **Store**: [`VirtualFileStore`] holds files; [`VirtualFileStore::snapshot`]
//!    freezes them for one build.
//! 2. **Transform**: each `.jsx/.tsx/.js/.ts` file is lowered to plain ES modules
//!    calling `createElement`, with TypeScript syntax erased.
//! 3. **Resolve**: imports are walked from the entry, specifiers are rewritten to
//!    import-map keys, and misses become placeholder modules.
//! 4. **Assemble**: the import map, module URLs, inlined CSS and a boot script
//!    form one HTML document.
//!
//! Only a syntax error or a missing entry fails a build, and both still render
//! as an HTML document through [`render_outcome`].

pub mod cache;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod import_map;
pub mod jsx_lowerer;
pub mod logging;
pub mod parse;
pub mod path;
pub mod pipeline;
pub mod placeholder;
pub mod resolver;
pub mod specifier;
pub mod transform;
pub mod vfs;

#[cfg(test)]
mod resolver_tests;

pub use cache::PreviewCache;
pub use commands::{execute_tool, CommandError, EditorCommand, FileManagerCommand, ToolCall};
pub use config::{BuildConfig, ConfigError};
pub use document::{iframe_markup, render_document, render_error_document, SANDBOX_PERMISSIONS};
pub use error::{BuildError, SyntaxError, VfsError};
pub use import_map::ImportMap;
pub use logging::init_logging;
pub use path::normalize_path;
pub use pipeline::{
    build_graph, build_preview, outcome_to_json, render_outcome, BuildOutcome, BuildSequencer,
    BuildTicket, Preview, PreviewBuilder,
};
pub use resolver::{ModuleGraph, ResolvedModule, Stylesheet};
pub use transform::{transform_source, OutputKind, TransformOutput};
pub use vfs::{FileNode, NodeKind, Snapshot, VirtualFileStore};
