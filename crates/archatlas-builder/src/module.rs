//! go.mod parsing and import classification

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModuleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Require {
    pub path: String,
    pub version: String,
    /// Marked `// indirect` in go.mod.
    pub indirect: bool,
}

/// Module facts from a go.mod file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModuleInfo {
    pub path: String,
    pub go_version: Option<String>,
    pub requires: Vec<Require>,
}

impl ModuleInfo {
    pub fn new(path: impl Into<String>) -> Self {
        ModuleInfo {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ModuleError> {
        let mut module_path = None;
        let mut go_version = None;
        let mut requires = Vec::new();
        let mut in_require_block = false;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if in_require_block {
                if line == ")" {
                    in_require_block = false;
                } else if let Some(req) = parse_require(line) {
                    requires.push(req);
                }
                continue;
            }

            if let Some(rest) = keyword(line, "module") {
                module_path = rest.split_whitespace().next().map(|p| p.trim_matches('"').to_string());
            } else if let Some(rest) = keyword(line, "go") {
                go_version = rest.split_whitespace().next().map(str::to_string);
            } else if let Some(rest) = keyword(line, "require") {
                let rest = rest.trim();
                if let Some(inner) = rest.strip_prefix('(') {
                    let inner = inner.trim();
                    match inner.strip_suffix(')') {
                        // require ( path version )
                        Some(single) => requires.extend(parse_require(single.trim())),
                        None if inner.is_empty() => in_require_block = true,
                        None => {
                            requires.extend(parse_require(inner));
                            in_require_block = true;
                        }
                    }
                } else {
                    requires.extend(parse_require(rest));
                }
            }
        }

        let path = module_path.ok_or(ModuleError::MissingModule)?;
        tracing::debug!(module = %path, requires = requires.len(), "parsed go.mod");

        Ok(ModuleInfo {
            path,
            go_version,
            requires,
        })
    }

    /// Whether `prefix` (a module path) is required directly or as a submodule.
    pub fn requires_module(&self, prefix: &str) -> bool {
        self.requires.iter().any(|r| path_has_prefix(&r.path, prefix))
    }
}

/// `keyword rest` -> `rest`, requiring whitespace or `(` after the keyword.
fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => Some(rest),
        _ => None,
    }
}

fn parse_require(line: &str) -> Option<Require> {
    let indirect = line.contains("// indirect");
    let clean = line.split("//").next().unwrap_or_default().trim();
    let mut parts = clean.split_whitespace();
    let path = parts.next()?;
    let version = parts.next()?;
    Some(Require {
        path: path.to_string(),
        version: version.to_string(),
        indirect,
    })
}

/// `path == prefix` or `path` is below `prefix`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Std,
    Internal,
    External,
    Vendor,
}

/// Classifies import paths relative to one module.
#[derive(Debug, Clone, Default)]
pub struct ImportClassifier {
    module_path: String,
}

impl ImportClassifier {
    pub fn new(module_path: impl Into<String>) -> Self {
        ImportClassifier {
            module_path: module_path.into(),
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn classify(&self, import_path: &str) -> ImportKind {
        if import_path.starts_with("vendor/") {
            return ImportKind::Vendor;
        }
        if import_path.starts_with("./") || import_path.starts_with("../") {
            return ImportKind::Internal;
        }
        if !self.module_path.is_empty() && path_has_prefix(import_path, &self.module_path) {
            return ImportKind::Internal;
        }
        let first_segment = import_path.split('/').next().unwrap_or_default();
        if !first_segment.contains('.') {
            return ImportKind::Std;
        }
        ImportKind::External
    }

    /// Module-relative package id for an internal import path.
    pub fn relative_id<'p>(&self, import_path: &'p str) -> Option<&'p str> {
        if let Some(rest) = import_path.strip_prefix("./") {
            return Some(rest);
        }
        if self.module_path.is_empty() {
            return None;
        }
        import_path
            .strip_prefix(self.module_path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}
