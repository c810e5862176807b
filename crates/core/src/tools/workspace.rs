//! Load a project directory into a [`FileSet`] and write one back out.

use super::extractor::FileSet;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Component, Path};
use tokio::fs;

/// Read every UTF-8 file under `root`, honouring `.gitignore`.
///
/// Dependency and build directories are skipped. Binary files are skipped.
/// Keys are `/`-separated paths relative to `root`.
pub fn load_files(root: &Path) -> Result<FileSet> {
    let mut files = FileSet::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !matches!(
                name.as_ref(),
                "node_modules" | ".next" | ".git" | "dist" | "build" | "target"
            )
        })
        .build();

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {:?}", entry.path()))?;
        match String::from_utf8(bytes) {
            Ok(content) => {
                files.insert(key, content);
            }
            Err(_) => tracing::debug!(path = %key, "Skipping non-UTF-8 file"),
        }
    }

    Ok(files)
}

/// A generated path is writable when it stays inside the output directory.
fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Write `files` below `out_dir`, creating parent directories.
///
/// Paths escaping `out_dir` are skipped with a warning. Returns the number
/// of files written.
pub async fn write_files(out_dir: &Path, files: &FileSet) -> Result<usize> {
    let mut written = 0;
    for (rel, content) in files {
        if !is_safe_relative(rel) {
            tracing::warn!(path = %rel, "Refusing to write outside the output directory");
            continue;
        }

        let path = out_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write file: {:?}", path))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new();
        files.insert("app/page.tsx".into(), "export default function Page() {}".into());
        files.insert("package.json".into(), "{}".into());
        files.insert("../escape.txt".into(), "nope".into());
        files.insert("/etc/passwd".into(), "nope".into());

        let written = write_files(dir.path(), &files).await.unwrap();
        assert_eq!(written, 2);
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());

        let loaded = load_files(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["app/page.tsx"], "export default function Page() {}");
    }

    #[test]
    fn test_load_skips_dependency_dirs_and_binaries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/react")).unwrap();
        std::fs::write(dir.path().join("node_modules/react/index.js"), "x").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
        std::fs::write(dir.path().join("index.ts"), "import 'zod'").unwrap();

        let loaded = load_files(dir.path()).unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["index.ts"]);
    }
}
