//! Import specifier classification and CDN URL synthesis.
//!
//! Classification is pure: it only looks at the specifier text and, for local
//! specifiers, at which paths exist in the snapshot. No network access happens
//! here; CDN URLs are plain string synthesis.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::BuildConfig;
use crate::path::{self, PROBE_EXTENSIONS};
use crate::vfs::Snapshot;

/// Framework runtime packages pinned to `BuildConfig::runtime_version`.
pub const RUNTIME_PACKAGES: [&str; 2] = ["react", "react-dom"];

lazy_static! {
    /// `name`, `@scope/name`, optionally followed by `@version` and a `/subpath`.
    static ref PACKAGE_RE: Regex =
        Regex::new(r"^((?:@[a-z0-9][\w.-]*/)?[a-z0-9][\w.-]*)(?:@([^/]+))?(/.*)?$").unwrap();

    static ref SCHEME_RE: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap();
}

/// A bare package specifier split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpecifier {
    pub name: String,
    pub version: Option<String>,
    pub subpath: Option<String>,
}

impl PackageSpecifier {
    pub fn parse(specifier: &str) -> Option<Self> {
        let caps = PACKAGE_RE.captures(specifier)?;
        Some(Self {
            name: caps.get(1)?.as_str().to_string(),
            version: caps.get(2).map(|m| m.as_str().to_string()),
            subpath: caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .filter(|s| s != "/"),
        })
    }

    pub fn is_runtime(&self) -> bool {
        RUNTIME_PACKAGES.contains(&self.name.as_str())
    }
}

/// What a literal import specifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A local script (or JSON/asset) file in the snapshot.
    Module(String),
    /// A local `.css` file, inlined rather than imported.
    Stylesheet(String),
    /// A local specifier that matched nothing. Carries the placeholder key.
    Missing(String),
    /// Framework runtime, pinned CDN URL.
    Runtime(String),
    /// Third-party package, CDN URL.
    Package(String),
    /// Bare `.css` import from a package, loaded with a `<link>` tag.
    ExternalStylesheet(String),
    /// Absolute URL passed through untouched.
    Url(String),
    /// Anything the browser cannot load (e.g. `node:fs`). Carries the placeholder key.
    Unsupported(String),
}

impl Resolution {
    /// `true` for resolutions that are served by a synthesized placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Resolution::Missing(_) | Resolution::Unsupported(_))
    }
}

/// Import-map key of a local module: `@` followed by its absolute path.
pub fn module_key(path: &str) -> String {
    format!("@{}", path)
}

/// CDN URL for the pinned framework runtime.
pub fn runtime_url(package: &PackageSpecifier, config: &BuildConfig) -> String {
    format!(
        "{}/{}@{}{}",
        config.cdn_base_url,
        package.name,
        config.runtime_version,
        package.subpath.as_deref().unwrap_or("")
    )
}

/// CDN URL for a third-party package.
pub fn package_url(package: &PackageSpecifier, config: &BuildConfig) -> String {
    let mut url = format!("{}/{}", config.cdn_base_url, package.name);
    if let Some(version) = &package.version {
        url.push('@');
        url.push_str(version);
    }
    if let Some(subpath) = &package.subpath {
        url.push_str(subpath);
    }
    if config.shared_runtime && !package.subpath.as_deref().is_some_and(path::is_stylesheet) {
        url.push_str("?external=");
        url.push_str(&RUNTIME_PACKAGES.join(","));
    }
    url
}

/// Finds the file a local import refers to.
///
/// Order: the exact path, then `.jsx`, `.tsx`, `.js`, `.ts` appended, then
/// `/index.{jsx,tsx,js,ts}`.
pub fn probe_local(snapshot: &Snapshot, base: &str) -> Option<String> {
    if snapshot.is_file(base) {
        return Some(base.to_string());
    }
    for ext in PROBE_EXTENSIONS {
        let candidate = format!("{}.{}", base, ext);
        if snapshot.is_file(&candidate) {
            return Some(candidate);
        }
    }
    for ext in PROBE_EXTENSIONS {
        let candidate = path::join(base, &format!("index.{}", ext));
        if snapshot.is_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn resolve_local(snapshot: &Snapshot, base: &str) -> Resolution {
    match probe_local(snapshot, base) {
        Some(found) if path::is_stylesheet(&found) => Resolution::Stylesheet(found),
        Some(found) => Resolution::Module(found),
        None => Resolution::Missing(module_key(base)),
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Classifies `specifier` as written in `importer`.
pub fn resolve_specifier(
    snapshot: &Snapshot,
    importer: &str,
    specifier: &str,
    config: &BuildConfig,
) -> Resolution {
    if let Some(rest) = specifier.strip_prefix("@/") {
        let base = path::join_relative("/", &format!("./{}", rest));
        return resolve_local(snapshot, &base);
    }
    if is_relative(specifier) {
        return resolve_local(snapshot, &path::join_relative(importer, specifier));
    }
    if specifier.starts_with('/') {
        return resolve_local(snapshot, &path::join_relative("/", specifier));
    }

    if SCHEME_RE.is_match(specifier) {
        let lower = specifier.to_ascii_lowercase();
        if ["http:", "https:", "data:", "blob:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
        {
            return Resolution::Url(specifier.to_string());
        }
        return Resolution::Unsupported(unsupported_key(specifier));
    }

    match PackageSpecifier::parse(specifier) {
        Some(package) if package.is_runtime() => Resolution::Runtime(runtime_url(&package, config)),
        Some(package) if package.subpath.as_deref().is_some_and(path::is_stylesheet) => {
            Resolution::ExternalStylesheet(package_url(&package, config))
        }
        Some(package) => Resolution::Package(package_url(&package, config)),
        None => Resolution::Unsupported(unsupported_key(specifier)),
    }
}

/// Placeholder key for a specifier no loader can fetch.
pub fn unsupported_key(specifier: &str) -> String {
    format!("@unresolved/{}", specifier)
}
