//! Page discovery.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use log::{debug, error};
use regex::Regex;
use serde_json::Value;

use crate::pipeline::{Flow, Markup, Reply, RequestContext, Route};
use crate::router::{RouteMethod, strip_trailing_slash};
use crate::server::Error;

/// Directories probed, in order, when no pages directory is configured.
pub const DEFAULT_PAGE_DIRS: [&str; 3] = ["./pages", "./src/pages", "./dist/pages"];

/// How a page file is served.
#[derive(Debug, Clone, PartialEq)]
pub enum PageKind {
    /// `.html` and `.htm` files.
    Markup(String),
    /// `.json` files that hold valid JSON.
    Json(Value),
    /// Everything else.
    Text(String),
}

impl PageKind {
    fn from_file(path: &Path, contents: String) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("html" | "htm") => PageKind::Markup(contents),
            Some("json") => match serde_json::from_str(&contents) {
                Ok(value) => PageKind::Json(value),
                Err(_) => PageKind::Text(contents),
            },
            _ => PageKind::Text(contents),
        }
    }

    fn reply(&self) -> Reply {
        match self {
            PageKind::Markup(html) => Reply::from(Markup::new(html.clone())),
            PageKind::Json(value) => Reply::from(value.clone()),
            PageKind::Text(text) => Reply::from(text.clone()),
        }
    }
}

/// A page found on disk, ready to be registered.
#[derive(Debug, Clone)]
pub struct Page {
    pub method: RouteMethod,
    /// The route pattern derived from the file's relative path.
    pub pattern: String,
    /// The file the page was read from.
    pub source: PathBuf,
    pub kind: PageKind,
}

impl Page {
    /// A route that serves the page's contents as read at startup.
    pub fn route(&self) -> Route {
        let kind = self.kind.clone();
        Route::new(move |_req: &mut RequestContext| {
            let reply = kind.reply();
            async move { Ok(Flow::Reply(reply)) }
        })
    }
}

/// Matches a `[name]` placeholder. The expression is a constant, so the
/// `None` arm is unreachable in practice.
fn param_regex() -> Option<&'static Regex> {
    static PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    PARAM
        .get_or_init(|| Regex::new(r"\[([a-z0-9_\-]+)\]").ok())
        .as_ref()
}

/// The route pattern for a file at `relative` inside the pages directory.
///
/// `[name]` becomes `:name`, the file extension is dropped, a trailing
/// `index` maps to its directory, and a trailing slash is removed.
pub fn route_pattern(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(file_name) = segments.last_mut() {
        let stem = Path::new(file_name.as_str())
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        if let Some(stem) = stem {
            *file_name = stem;
        }
    }

    let mut pattern = format!("/{}", segments.join("/"));
    if let Some(param) = param_regex() {
        pattern = param.replace_all(&pattern, ":$1").into_owned();
    }

    if let Some(parent) = pattern.strip_suffix("/index") {
        pattern = format!("{parent}/");
    }

    strip_trailing_slash(&pattern).to_string()
}

/// Walk `root` and build a page for every file in it, in path order.
///
/// A file that cannot be read is logged and skipped; a directory that
/// cannot be walked fails the whole discovery.
pub fn discover_pages(root: &Path) -> Result<Vec<Page>, Error> {
    let mut pages = Vec::new();

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("Failed to load page {path}: {e}", path = path.display());
                continue;
            }
        };

        let pattern = route_pattern(relative);
        debug!("Discovered page {pattern} at {path}", path = path.display());

        pages.push(Page {
            method: RouteMethod::Get,
            pattern,
            source: path.to_path_buf(),
            kind: PageKind::from_file(path, contents),
        });
    }

    Ok(pages)
}

/// The pages directory to load: `configured` if given, otherwise the first
/// of [`DEFAULT_PAGE_DIRS`] that exists.
pub fn find_pages_dir(configured: Option<&Path>) -> Option<PathBuf> {
    match configured {
        Some(dir) => dir.is_dir().then(|| dir.to_path_buf()),
        None => DEFAULT_PAGE_DIRS
            .iter()
            .map(PathBuf::from)
            .find(|dir| dir.is_dir()),
    }
}
