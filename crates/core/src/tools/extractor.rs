//! # Extractor - Files and Imports from Generated Text
//!
//! Agents answer in free-form markdown. Two things are pulled out of it:
//!
//! - fenced code blocks carrying a `file="path"` attribute, which become
//!   entries of a [`FileSet`]
//! - ESM / CommonJS import specifiers, canonicalized to npm package names
//!
//! Both are line/regex based and never fail: anything malformed is skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Generated file path -> content. Later writes to a path win.
pub type FileSet = BTreeMap<String, String>;

/// Node runtime modules that never resolve against the registry
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Extensions scanned by [`extract_dependencies`]
const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

fn file_attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bfile\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid file attribute regex")
    })
}

fn import_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            // import x from '...', import { a } from '...', export * from '...'
            r#"\bfrom\s+['"]([^'"\n]+)['"]"#,
            // import '...'
            r#"\bimport\s+['"]([^'"\n]+)['"]"#,
            // import('...')
            r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
            // require('...')
            r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid import regex"))
        .collect()
    })
}

/// Pull every ```` ```lang file="path" ```` block out of `text`.
///
/// Content is the fenced body with surrounding whitespace trimmed. A block
/// closes on a bare fence at least as long as its opening one, so a
/// four-backtick block can hold ordinary fences. A block that is never
/// closed, or that is interrupted by another `file=` fence, is dropped.
/// Repeated paths keep the last block.
pub fn extract_files(text: &str) -> FileSet {
    let mut files = FileSet::new();
    let mut current: Option<OpenBlock<'_>> = None;

    for line in text.lines() {
        let Some((width, info)) = fence(line) else {
            if let Some(block) = current.as_mut() {
                block.body.push(line);
            }
            continue;
        };

        match current.as_ref().map(|block| block.width) {
            Some(open) if width >= open && info.is_empty() => {
                if let Some(block) = current.take() {
                    files.insert(block.path, block.body.join("\n").trim().to_string());
                }
            }
            Some(open) if width >= open && file_attribute(info).is_some() => {
                // An unfinished block before a new file fence is discarded.
                current = file_attribute(info).map(|path| OpenBlock::new(path, width));
            }
            Some(_) => {
                // Shorter fences and fences without a path belong to the body.
                if let Some(block) = current.as_mut() {
                    block.body.push(line);
                }
            }
            None => {
                current = file_attribute(info).map(|path| OpenBlock::new(path, width));
            }
        }
    }

    files
}

struct OpenBlock<'a> {
    path: String,
    /// Backticks in the opening fence
    width: usize,
    body: Vec<&'a str>,
}

impl OpenBlock<'_> {
    fn new(path: String, width: usize) -> Self {
        Self {
            path,
            width,
            body: Vec::new(),
        }
    }
}

/// Backtick count and trimmed info string of a fence line.
fn fence(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let width = trimmed.bytes().take_while(|&b| b == b'`').count();
    (width >= 3).then(|| (width, trimmed[width..].trim()))
}

fn file_attribute(fence_info: &str) -> Option<String> {
    let caps = file_attribute_re().captures(fence_info)?;
    let path = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    (!path.is_empty()).then(|| path.to_string())
}

/// Canonical npm package name for an import specifier, or `None` for
/// relative paths, path aliases, URLs and runtime builtins.
///
/// `@scope/name/sub` -> `@scope/name`, `name/sub` -> `name`.
pub fn canonical_package_name(specifier: &str) -> Option<String> {
    let spec = specifier.trim();
    if spec.is_empty()
        || spec.starts_with('.')
        || spec.starts_with('/')
        || spec.starts_with('~')
        || spec.starts_with("@/")
        || spec.contains(':')
    {
        return None;
    }

    let name = if spec.starts_with('@') {
        let mut segments = spec.splitn(3, '/');
        let scope = segments.next()?;
        let pkg = segments.next().filter(|s| !s.is_empty())?;
        format!("{scope}/{pkg}")
    } else {
        spec.split('/').next()?.to_string()
    };

    if NODE_BUILTINS.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}

fn scan_imports(content: &str) -> impl Iterator<Item = String> + '_ {
    import_res().iter().flat_map(move |re| {
        re.captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| canonical_package_name(m.as_str()))
    })
}

/// Deduplicated package names imported anywhere in `contents`.
pub fn extract_import_names<'a>(contents: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    contents.into_iter().flat_map(scan_imports).collect()
}

/// A package name and the first file that imported it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedDependency {
    pub name: String,
    pub source: String,
}

/// Imports of script files only, with provenance, in first-seen order.
pub fn extract_dependencies(files: &FileSet) -> Vec<ExtractedDependency> {
    let mut seen: BTreeMap<String, ()> = BTreeMap::new();
    let mut deps = Vec::new();

    for (path, content) in files {
        if !SCRIPT_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }
        for name in scan_imports(content) {
            if seen.insert(name.clone(), ()).is_none() {
                deps.push(ExtractedDependency {
                    name,
                    source: path.clone(),
                });
            }
        }
    }

    deps
}
