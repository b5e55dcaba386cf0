//! Module graph resolution.
//!
//! Starting from the entry, every statically imported local file is
//! transformed, its import specifiers classified and rewritten, and the whole
//! closure is linked through one import map. Local misses degrade to
//! placeholder modules; only syntax errors and a missing entry are fatal.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, SyntaxError};
use crate::import_map::ImportMap;
use crate::parse::{self, apply_edits, quote_js, ImportKind, ImportSite};
use crate::path;
use crate::placeholder::{is_plain_identifier, module_data_url, placeholder_url};
use crate::specifier::{module_key, resolve_specifier, Resolution};
use crate::transform::{transform_source, OutputKind, TransformOutput};
use crate::vfs::Snapshot;

/// Entry candidates, probed in order before the lexicographic fallback.
pub const ENTRY_CANDIDATES: [&str; 6] = [
    "/App.jsx",
    "/App.tsx",
    "/index.jsx",
    "/index.tsx",
    "/src/App.jsx",
    "/src/App.tsx",
];

const STYLE_PROXY: &str =
    "new Proxy({}, { get: (_, key) => (typeof key === \"string\" ? key : undefined) })";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModule {
    pub original_path: String,
    /// Import-map key, `@` followed by the path.
    pub key: String,
    /// Loadable module URL.
    pub url: String,
    pub transformed_code: String,
    /// Specifier as written → URL it now loads.
    pub import_specifier_rewrites: BTreeMap<String, String>,
    /// Local stylesheets imported by this module, in import order.
    pub css_dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stylesheet {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedImport {
    pub importer: String,
    pub specifier: String,
    /// Import-map key of the placeholder that stands in for it.
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleGraph {
    pub entry: String,
    /// Every module in the closure, entry first, in discovery order.
    pub modules: Vec<ResolvedModule>,
    pub import_map: ImportMap,
    /// Local CSS in evaluation order, deduplicated.
    pub stylesheets: Vec<Stylesheet>,
    /// Package stylesheet URLs loaded with `<link>`.
    pub external_stylesheets: Vec<String>,
    pub unresolved: Vec<UnresolvedImport>,
}

impl ModuleGraph {
    pub fn entry_key(&self) -> String {
        module_key(&self.entry)
    }

    pub fn module(&self, path: &str) -> Option<&ResolvedModule> {
        self.modules.iter().find(|m| m.original_path == path)
    }
}

/// Picks the module the preview mounts.
pub fn select_entry(
    snapshot: &Snapshot,
    entry_override: Option<&str>,
) -> Result<String, BuildError> {
    if let Some(requested) = entry_override {
        let normalized = path::normalize_path(requested);
        if snapshot.is_file(&normalized) && path::is_script(&normalized) {
            return Ok(normalized);
        }
        warn!(entry = requested, "entry override does not name a script file");
        return Err(BuildError::NoEntryPoint);
    }

    if let Some(found) = ENTRY_CANDIDATES
        .iter()
        .find(|candidate| snapshot.is_file(candidate))
    {
        return Ok(found.to_string());
    }

    snapshot
        .files()
        .map(|(file_path, _)| file_path)
        .filter(|file_path| path::is_component_file(file_path))
        .min()
        .map(str::to_string)
        .ok_or(BuildError::NoEntryPoint)
}

/// One module after transformation, before specifier rewriting.
struct Discovered {
    path: String,
    output: TransformOutput,
    sites: Vec<(ImportSite, Resolution)>,
}

/// A stylesheet or module edge, in import order.
enum Dependency {
    Module(String),
    Stylesheet(String),
}

fn transform_and_scan(
    snapshot: &Snapshot,
    file_path: &str,
) -> Result<(TransformOutput, Vec<ImportSite>), SyntaxError> {
    let source = snapshot.read(file_path).unwrap_or_default();
    let output = transform_source(file_path, source)?;
    let sites = match output.kind {
        OutputKind::Script => parse::scan_script(file_path, &output.code)?,
        _ => Vec::new(),
    };
    Ok((output, sites))
}

/// Transforms the import closure of `entry`, one breadth-first level at a time.
/// Files within a level are transformed in parallel; the first failure in
/// discovery order is returned.
fn discover(
    snapshot: &Snapshot,
    entry: &str,
    config: &BuildConfig,
) -> Result<Vec<Discovered>, SyntaxError> {
    let mut visited: HashSet<String> = HashSet::from([entry.to_string()]);
    let mut frontier = vec![entry.to_string()];
    let mut discovered = Vec::new();

    while !frontier.is_empty() {
        let results: Vec<_> = frontier
            .par_iter()
            .map(|file_path| transform_and_scan(snapshot, file_path))
            .collect();

        let mut next = Vec::new();
        for (file_path, result) in frontier.into_iter().zip(results) {
            let (output, sites) = result?;
            let mut resolved = Vec::with_capacity(sites.len());
            for site in sites {
                let resolution = resolve_specifier(snapshot, &file_path, &site.specifier, config);
                if let Resolution::Module(target) = &resolution {
                    if site.kind != ImportKind::Dynamic && visited.insert(target.clone()) {
                        next.push(target.clone());
                    }
                }
                resolved.push((site, resolution));
            }
            discovered.push(Discovered {
                path: file_path,
                output,
                sites: resolved,
            });
        }
        frontier = next;
    }

    Ok(discovered)
}

fn stylesheet_value(imported: Option<&str>) -> String {
    match imported {
        None | Some("default") => STYLE_PROXY.to_string(),
        Some(name) => quote_js(name),
    }
}

/// Replacement text for an import statement that loaded a stylesheet.
fn stylesheet_bindings(site: &ImportSite) -> String {
    site.bindings
        .iter()
        .map(|binding| {
            format!(
                "const {} = {};",
                binding.local,
                stylesheet_value(binding.imported.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replacement text for `export { a } from "./x.css"`: every re-exported name
/// stays exported with the value an import of it would have seen.
fn stylesheet_reexports(site: &ImportSite) -> String {
    site.reexport_bindings
        .iter()
        .enumerate()
        .map(|(idx, binding)| {
            let value = stylesheet_value(binding.imported.as_deref());
            if binding.local != "default" && is_plain_identifier(&binding.local) {
                return format!("export const {} = {};", binding.local, value);
            }
            let temp = format!("__css_export_{}_{}", site.statement_span.0, idx);
            format!(
                "const {} = {}; export {{ {} as {} }};",
                temp,
                value,
                temp,
                if is_plain_identifier(&binding.local) {
                    binding.local.clone()
                } else {
                    quote_js(&binding.local)
                }
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn stylesheet_edit(site: &ImportSite) -> (u32, u32, String) {
    let replacement = match site.kind {
        ImportKind::Dynamic => format!("Promise.resolve({{ default: {} }})", STYLE_PROXY),
        ImportKind::ReExport => stylesheet_reexports(site),
        ImportKind::Static | ImportKind::SideEffect => stylesheet_bindings(site),
    };
    (site.statement_span.0, site.statement_span.1, replacement)
}

fn module_body(output: &TransformOutput, file_path: &str) -> String {
    let code = match output.kind {
        OutputKind::Script | OutputKind::Json => output.code.clone(),
        OutputKind::Stylesheet | OutputKind::Asset => {
            format!("export default {};", quote_js(&output.code))
        }
    };
    format!("{}\n//# sourceURL={}\n", code.trim_end(), file_path)
}

struct Rewritten {
    path: String,
    code: String,
    /// Specifier → import-map key or URL it was routed to.
    routes: Vec<(String, String)>,
    css_dependencies: Vec<String>,
    dependencies: Vec<Dependency>,
}

/// Builds the module graph rooted at `entry`.
pub fn resolve_graph(
    snapshot: &Snapshot,
    entry: &str,
    config: &BuildConfig,
) -> Result<ModuleGraph, BuildError> {
    let discovered = discover(snapshot, entry, config)?;
    let in_graph: HashSet<&str> = discovered.iter().map(|d| d.path.as_str()).collect();

    let mut import_map = ImportMap::with_runtime(config);
    let mut placeholder_names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut external_stylesheets: Vec<String> = Vec::new();
    let mut unresolved = Vec::new();
    let mut rewritten = Vec::with_capacity(discovered.len());

    for module in &discovered {
        let mut edits = Vec::new();
        let mut routes = Vec::new();
        let mut css_dependencies: Vec<String> = Vec::new();
        let mut dependencies = Vec::new();

        for (site, resolution) in &module.sites {
            match resolution {
                Resolution::Module(target) => {
                    let key = module_key(target);
                    if site.kind == ImportKind::Dynamic && !in_graph.contains(target.as_str()) {
                        placeholder_names.entry(key.clone()).or_default();
                    } else if site.kind != ImportKind::Dynamic {
                        dependencies.push(Dependency::Module(target.clone()));
                    }
                    edits.push((site.literal_span.0, site.literal_span.1, quote_js(&key)));
                    routes.push((site.specifier.clone(), key));
                }
                Resolution::Stylesheet(css) => {
                    edits.push(stylesheet_edit(site));
                    if !css_dependencies.contains(css) {
                        css_dependencies.push(css.clone());
                    }
                    dependencies.push(Dependency::Stylesheet(css.clone()));
                }
                Resolution::ExternalStylesheet(url) => {
                    edits.push(stylesheet_edit(site));
                    if !external_stylesheets.contains(url) {
                        external_stylesheets.push(url.clone());
                    }
                    routes.push((site.specifier.clone(), url.clone()));
                }
                Resolution::Missing(key) | Resolution::Unsupported(key) => {
                    if let Resolution::Missing(_) = resolution {
                        if path::is_stylesheet(&site.specifier) {
                            warn!(
                                importer = %module.path,
                                specifier = %site.specifier,
                                "stylesheet not found, import dropped"
                            );
                            edits.push(stylesheet_edit(site));
                            continue;
                        }
                    }
                    warn!(
                        importer = %module.path,
                        specifier = %site.specifier,
                        placeholder = %key,
                        "unresolved import, using placeholder"
                    );
                    placeholder_names
                        .entry(key.clone())
                        .or_default()
                        .extend(site.requested_names().map(str::to_string));
                    unresolved.push(UnresolvedImport {
                        importer: module.path.clone(),
                        specifier: site.specifier.clone(),
                        placeholder: key.clone(),
                    });
                    edits.push((site.literal_span.0, site.literal_span.1, quote_js(key)));
                    routes.push((site.specifier.clone(), key.clone()));
                }
                Resolution::Runtime(url) | Resolution::Package(url) => {
                    import_map.insert_if_absent(&site.specifier, url);
                    routes.push((site.specifier.clone(), site.specifier.clone()));
                }
                Resolution::Url(url) => {
                    routes.push((site.specifier.clone(), url.clone()));
                }
            }
        }

        rewritten.push(Rewritten {
            path: module.path.clone(),
            code: module_body(
                &TransformOutput {
                    code: apply_edits(&module.output.code, edits),
                    kind: module.output.kind,
                },
                &module.path,
            ),
            routes,
            css_dependencies,
            dependencies,
        });
    }

    let mut urls: HashMap<String, String> = HashMap::new();
    for module in &rewritten {
        let key = module_key(&module.path);
        let url = module_data_url(&module.code);
        import_map.insert_if_absent(&key, &url);
        urls.insert(key, url);
    }
    for (key, names) in &placeholder_names {
        let url = placeholder_url(names);
        import_map.insert_if_absent(key, &url);
        urls.insert(key.clone(), url);
    }
    // Aliases as written (`@/components/Button`) resolve too.
    for module in &rewritten {
        for (specifier, target) in &module.routes {
            if specifier.starts_with("@/") {
                if let Some(url) = urls.get(target).cloned() {
                    import_map.insert_if_absent(specifier, &url);
                }
            }
        }
    }

    let stylesheets = stylesheet_order(entry, &rewritten)
        .into_iter()
        .map(|css| Stylesheet {
            content: snapshot.read(&css).unwrap_or_default().to_string(),
            path: css,
        })
        .collect();

    let modules: Vec<ResolvedModule> = rewritten
        .into_iter()
        .map(|module| {
            let key = module_key(&module.path);
            let import_specifier_rewrites = module
                .routes
                .iter()
                .map(|(specifier, target)| {
                    let url = urls
                        .get(target)
                        .cloned()
                        .or_else(|| import_map.get(target).map(str::to_string))
                        .unwrap_or_else(|| target.clone());
                    (specifier.clone(), url)
                })
                .collect();
            ResolvedModule {
                url: urls.get(&key).cloned().unwrap_or_default(),
                original_path: module.path,
                key,
                transformed_code: module.code,
                import_specifier_rewrites,
                css_dependencies: module.css_dependencies,
            }
        })
        .collect();

    debug!(
        entry,
        modules = modules.len(),
        placeholders = placeholder_names.len(),
        "resolved module graph"
    );

    Ok(ModuleGraph {
        entry: entry.to_string(),
        modules,
        import_map,
        stylesheets,
        external_stylesheets,
        unresolved,
    })
}

/// Local stylesheets in module evaluation order: depth-first from the entry,
/// each module's imports in source order, each stylesheet at its first use.
fn stylesheet_order(entry: &str, modules: &[Rewritten]) -> Vec<String> {
    fn visit<'m>(
        module_path: &str,
        by_path: &HashMap<&str, &'m Rewritten>,
        seen_modules: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        if !seen_modules.insert(module_path.to_string()) {
            return;
        }
        let Some(module) = by_path.get(module_path) else {
            return;
        };
        for dependency in &module.dependencies {
            match dependency {
                Dependency::Module(target) => visit(target, by_path, seen_modules, order),
                Dependency::Stylesheet(css) => {
                    if !order.contains(css) {
                        order.push(css.clone());
                    }
                }
            }
        }
    }

    let by_path: HashMap<&str, &Rewritten> =
        modules.iter().map(|m| (m.path.as_str(), m)).collect();
    let mut order = Vec::new();
    visit(entry, &by_path, &mut HashSet::new(), &mut order);

    // Stylesheets reached only through dynamic imports go last.
    for module in modules {
        for css in &module.css_dependencies {
            if !order.contains(css) {
                order.push(css.clone());
            }
        }
    }
    order
}
