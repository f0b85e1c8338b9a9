// Import-path resolution and cycle detection (spec.md §4.3).
//
// Grounded on `jounce::module_loader::ModuleLoader`'s cache + loading-stack
// shape, trimmed to this language's flatter import grammar (`import { a, b }
// from "path";`, no `::`-qualified package namespace, no glob/alias forms).
// As in the teacher, resolution and cycle detection are purely path-keyed;
// unlike the teacher, this resolver does not recursively parse imports
// itself - it hands back source text and lets the driver (`crate::Compiler`)
// walk the import graph, so each module's `Ast` arena can be owned by the
// driver's own per-module arena list instead of living inside this cache.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::CompileError;

pub struct ModuleResolver {
    search_paths: Vec<PathBuf>,
    source_cache: HashMap<PathBuf, String>,
    loading_stack: Vec<PathBuf>,
    loading_set: HashSet<PathBuf>,
}

impl ModuleResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            source_cache: HashMap::new(),
            loading_stack: Vec::new(),
            loading_set: HashSet::new(),
        }
    }

    /// `["stdlib", "examples", "."]`, tried after the importing file's own
    /// directory and before the process's current working directory
    /// (spec.md §4.3).
    pub fn default_search_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("stdlib"),
            PathBuf::from("examples"),
            PathBuf::from("."),
        ]
    }

    /// Resolves `specifier` (as written in an `import ... from "specifier"`)
    /// relative to the file that imports it. Resolution order: the
    /// importing file's own directory, then each registered search path, then
    /// the process's current directory - each tried first with a `.zs`
    /// extension appended, then as written.
    pub fn resolve(&self, importing_file: &Path, specifier: &str) -> Result<PathBuf, CompileError> {
        let mut bases: Vec<PathBuf> = Vec::new();
        if let Some(dir) = importing_file.parent() {
            bases.push(dir.to_path_buf());
        }
        bases.extend(self.search_paths.iter().cloned());
        bases.push(PathBuf::from("."));

        let mut searched = Vec::new();
        for base in &bases {
            let candidate = base.join(specifier);
            for ext in [".zs", ""] {
                let with_ext = if ext.is_empty() {
                    candidate.clone()
                } else {
                    let mut p = candidate.clone().into_os_string();
                    p.push(ext);
                    PathBuf::from(p)
                };
                if with_ext.is_file() {
                    return Ok(with_ext);
                }
                searched.push(with_ext);
            }
        }

        Err(CompileError::ModuleNotFound {
            reference: specifier.to_string(),
            searched,
        })
    }

    /// Canonicalizes `path` and records it as in-progress, failing with
    /// `CircularDependency` if it is already on the loading stack.
    pub fn begin_loading(&mut self, path: &Path) -> Result<PathBuf, CompileError> {
        let canonical = canonicalize_best_effort(path);
        if self.loading_set.contains(&canonical) {
            let mut cycle: Vec<String> = self
                .loading_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(canonical.display().to_string());
            return Err(CompileError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }
        self.loading_set.insert(canonical.clone());
        self.loading_stack.push(canonical.clone());
        Ok(canonical)
    }

    pub fn finish_loading(&mut self, canonical: &Path) {
        self.loading_set.remove(canonical);
        self.loading_stack.pop();
    }

    /// Reads and caches the source text at `canonical`, a path already
    /// returned by `begin_loading`.
    pub fn load_source(&mut self, canonical: &Path) -> Result<String, CompileError> {
        if let Some(cached) = self.source_cache.get(canonical) {
            return Ok(cached.clone());
        }
        let source = fs::read_to_string(canonical).map_err(|e| CompileError::Io {
            path: canonical.to_path_buf(),
            message: e.to_string(),
        })?;
        self.source_cache.insert(canonical.to_path_buf(), source.clone());
        Ok(source)
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zscript_resolver_test_{}", name));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn resolves_sibling_module_with_extension() {
        let dir = temp_dir("sibling");
        fs::write(dir.join("util.zs"), "fn f() {}").unwrap();
        let importer = dir.join("main.zs");
        let resolver = ModuleResolver::new(ModuleResolver::default_search_paths());
        let resolved = resolver.resolve(&importer, "util").unwrap();
        assert_eq!(resolved, dir.join("util.zs"));
    }

    #[test]
    fn missing_module_reports_searched_paths() {
        let dir = temp_dir("missing");
        let importer = dir.join("main.zs");
        let resolver = ModuleResolver::new(ModuleResolver::default_search_paths());
        let err = resolver.resolve(&importer, "does_not_exist").unwrap_err();
        match err {
            CompileError::ModuleNotFound { searched, .. } => assert!(!searched.is_empty()),
            _ => panic!("expected ModuleNotFound"),
        }
    }

    #[test]
    fn detects_circular_dependency() {
        let dir = temp_dir("cycle");
        let a = dir.join("a.zs");
        fs::File::create(&a).unwrap().write_all(b"fn a() {}").unwrap();
        let mut resolver = ModuleResolver::new(ModuleResolver::default_search_paths());
        let canonical = resolver.begin_loading(&a).unwrap();
        let err = resolver.begin_loading(&a).unwrap_err();
        assert!(matches!(err, CompileError::CircularDependency { .. }));
        resolver.finish_loading(&canonical);
        assert!(resolver.begin_loading(&a).is_ok());
    }
}
