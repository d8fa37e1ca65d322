//! Read-only view of the target's source and configuration tree.

use readyprobe_common::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "build", "__pycache__"];

/// Default size limit for inspected files (1 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Where and what to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub source_root: PathBuf,
    /// File extensions (without dot) or exact file names to read.
    pub extensions: Vec<String>,
    pub max_file_bytes: u64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        let extensions = [
            "rs", "go", "py", "rb", "php", "java", "kt", "cs", "js", "jsx", "ts", "tsx", "mjs",
            "json", "yaml", "yml", "toml", "ini", "conf", "xml", "sql", "sh", "tf", "md",
            "Dockerfile", "Procfile",
        ];
        Self {
            source_root: PathBuf::from("."),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// One inspected text file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the root, '/'-separated.
    pub path: String,
    pub content: String,
}

/// Location of a pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub path: String,
    pub line: usize,
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Files loaded from a source root. Every query is a pure read.
#[derive(Debug, Clone)]
pub struct SourceCorpus {
    root: PathBuf,
    files: Vec<SourceFile>,
    max_file_bytes: u64,
}

impl SourceCorpus {
    pub fn new(root: impl Into<PathBuf>, files: Vec<SourceFile>) -> Self {
        Self {
            root: root.into(),
            files,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// First line in any inspected file matching `pattern`.
    pub fn find(&self, pattern: &Regex) -> Option<Match> {
        self.files.iter().find_map(|file| {
            let found = pattern.find(&file.content)?;
            let line = file.content[..found.start()].matches('\n').count() + 1;
            Some(Match {
                path: file.path.clone(),
                line,
            })
        })
    }

    /// First of `candidates` (relative paths, files or directories) present
    /// under the root. Hidden paths are allowed here.
    pub fn existing(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find(|candidate| self.root.join(candidate).exists())
            .map(|candidate| candidate.to_string())
    }

    /// First of `candidates` whose contents match `pattern`.
    pub fn file_matching(&self, candidates: &[&str], pattern: &Regex) -> Result<Option<Match>> {
        for candidate in candidates {
            let path = self.root.join(candidate);
            if !path.is_file() {
                continue;
            }
            if fs::metadata(&path)?.len() > self.max_file_bytes {
                debug!("Skipping oversized {}", path.display());
                continue;
            }
            let content = fs::read_to_string(&path)?;
            if let Some(found) = pattern.find(&content) {
                return Ok(Some(Match {
                    path: candidate.to_string(),
                    line: content[..found.start()].matches('\n').count() + 1,
                }));
            }
        }
        Ok(None)
    }
}

/// Walks a source root and loads the text files worth inspecting.
pub struct SourceInspector {
    config: InspectorConfig,
}

impl SourceInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn load(&self) -> Result<SourceCorpus> {
        let root = &self.config.source_root;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "source root is not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_wanted(entry.path()) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
            if size > self.config.max_file_bytes {
                debug!("Skipping oversized {}", entry.path().display());
                continue;
            }
            // Binary or non-UTF-8 files are not text sources.
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            files.push(SourceFile {
                path: relative(root, entry.path()),
                content,
            });
        }

        debug!("Loaded {} source files from {}", files.len(), root.display());
        Ok(SourceCorpus {
            root: root.clone(),
            files,
            max_file_bytes: self.config.max_file_bytes,
        })
    }

    fn is_wanted(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted == extension || wanted == name)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_str().unwrap_or_default();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name))
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn inspector(root: &Path) -> SourceInspector {
        SourceInspector::new(InspectorConfig {
            source_root: root.to_path_buf(),
            ..InspectorConfig::default()
        })
    }

    #[test]
    fn test_skips_vendor_hidden_and_unlisted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.js", "const x = 1;");
        write(dir.path(), "node_modules/lib/index.js", "bcrypt");
        write(dir.path(), ".git/config", "[core]");
        write(dir.path(), "target/debug/out.rs", "fn main() {}");
        write(dir.path(), "image.png", "not really");
        write(dir.path(), "Dockerfile", "FROM alpine");

        let corpus = inspector(dir.path()).load().unwrap();
        let paths: Vec<&str> = corpus.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Dockerfile", "src/app.js"]);
    }

    #[test]
    fn test_skips_oversized_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.js", &"a".repeat(2048));
        write(dir.path(), "small.js", "ok");

        let corpus = SourceInspector::new(InspectorConfig {
            source_root: dir.path().to_path_buf(),
            max_file_bytes: 1024,
            ..InspectorConfig::default()
        })
        .load()
        .unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.files()[0].path, "small.js");
    }

    #[test]
    fn test_find_reports_line() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/auth.py", "import os\n\nhash = bcrypt.hashpw(pw)\n");
        let corpus = inspector(dir.path()).load().unwrap();

        let found = corpus.find(&Regex::new("bcrypt").unwrap()).unwrap();
        assert_eq!(found.to_string(), "src/auth.py:3");
        assert!(corpus.find(&Regex::new("argon2").unwrap()).is_none());
    }

    #[test]
    fn test_existing_and_file_matching_see_hidden_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".github/workflows/ci.yml", "on: push");
        write(dir.path(), ".gitignore", "node_modules\n.env\n");
        let corpus = inspector(dir.path()).load().unwrap();

        assert_eq!(
            corpus.existing(&["Jenkinsfile", ".github/workflows"]).as_deref(),
            Some(".github/workflows")
        );
        let found = corpus
            .file_matching(&[".gitignore"], &Regex::new(r"(?m)^\.env").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.line, 2);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(inspector(&missing).load().is_err());
    }
}
