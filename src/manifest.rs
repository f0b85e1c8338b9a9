// Package manifest shape (spec.md §6). Grounded on
// `raven_one::utility_config::UtilityConfig`'s `serde(default)` field style,
// re-targeted at `serde_json` since the manifest is a `package.json`-shaped
// file rather than a `.toml` one. No loader beyond `from_path`: the module
// resolver (`crate::module_resolver`) does not consult this file, per
// spec.md §4.3 - it exists only as the on-disk shape a build tool around
// this compiler would read.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CompileError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZigDependency {
    pub url: String,
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub main: Option<String>,

    #[serde(default)]
    pub exports: Option<Vec<String>>,

    #[serde(default)]
    pub dependencies: Option<std::collections::HashMap<String, String>>,

    #[serde(default)]
    pub dev_dependencies: Option<std::collections::HashMap<String, String>>,

    #[serde(default)]
    pub zig_dependencies: Option<std::collections::HashMap<String, ZigDependency>>,

    #[serde(default)]
    pub scripts: Option<std::collections::HashMap<String, String>>,

    #[serde(default)]
    pub repository: Option<String>,
}

impl PackageManifest {
    pub fn from_path(path: &Path) -> Result<Self, CompileError> {
        let text = fs::read_to_string(path).map_err(|e| CompileError::ManifestError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| CompileError::ManifestError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let dir = std::env::temp_dir().join("zscript_manifest_test_minimal");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("zscript.json");
        fs::write(&path, r#"{"name": "demo", "version": "0.1.0"}"#).unwrap();
        let manifest = PackageManifest::from_path(&path).unwrap();
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.version, "0.1.0");
        assert!(manifest.dependencies.is_none());
    }

    #[test]
    fn parses_full_manifest_with_zig_dependencies() {
        let dir = std::env::temp_dir().join("zscript_manifest_test_full");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("zscript.json");
        fs::write(
            &path,
            r#"{
                "name": "demo",
                "version": "0.1.0",
                "main": "src/main.zs",
                "dependencies": {"http": "^1.0.0"},
                "zig_dependencies": {
                    "zlib": {"url": "https://example.com/zlib.tar.gz", "hash": "1220abcd"}
                }
            }"#,
        )
        .unwrap();
        let manifest = PackageManifest::from_path(&path).unwrap();
        assert_eq!(manifest.main.as_deref(), Some("src/main.zs"));
        let zig = manifest.zig_dependencies.unwrap();
        assert_eq!(zig["zlib"].hash, "1220abcd");
    }

    #[test]
    fn missing_file_reports_manifest_error() {
        let err = PackageManifest::from_path(Path::new("/nonexistent/zscript.json")).unwrap_err();
        assert!(matches!(err, CompileError::ManifestError { .. }));
    }
}
