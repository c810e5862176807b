//! `package.json` synthesis for the generated Next.js app.

use serde::Serialize;
use std::collections::BTreeMap;

pub const MANIFEST_PATH: &str = "package.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest<'a> {
    name: &'a str,
    version: &'a str,
    private: bool,
    scripts: Scripts<'a>,
    description: &'a str,
    dependencies: &'a BTreeMap<String, String>,
    dev_dependencies: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct Scripts<'a> {
    dev: &'a str,
    build: &'a str,
    start: &'a str,
}

/// Pretty-printed manifest declaring `dependencies` (name -> range).
///
/// Returns `None` when nothing resolved: an app without dependencies gets no
/// manifest rather than an empty one.
pub fn synthesize_manifest(dependencies: &BTreeMap<String, String>) -> Option<String> {
    if dependencies.is_empty() {
        return None;
    }

    let manifest = PackageManifest {
        name: "generated-app",
        version: "1.0.0",
        private: true,
        scripts: Scripts {
            dev: "next dev -p 3000 -H 0.0.0.0",
            build: "next build",
            start: "next start -p 3000 -H 0.0.0.0",
        },
        description: "Generated Next.js application",
        dependencies,
        dev_dependencies: [
            ("typescript", "^5.0.0"),
            ("@types/node", "^20.0.0"),
            ("@types/react", "^18.0.0"),
        ]
        .into_iter()
        .collect(),
    };

    match serde_json::to_string_pretty(&manifest) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize manifest");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_dependencies_no_manifest() {
        assert!(synthesize_manifest(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_manifest_shape() {
        let deps: BTreeMap<String, String> = [("next", "^14.2.5"), ("react", "^18.3.1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let json = synthesize_manifest(&deps).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["name"], "generated-app");
        assert_eq!(value["private"], true);
        assert_eq!(value["scripts"]["dev"], "next dev -p 3000 -H 0.0.0.0");
        assert_eq!(value["dependencies"]["next"], "^14.2.5");
        assert_eq!(value["dependencies"].as_object().unwrap().len(), 2);
        assert_eq!(value["devDependencies"]["typescript"], "^5.0.0");
        assert!(json.contains('\n'), "manifest is pretty-printed");
    }
}
