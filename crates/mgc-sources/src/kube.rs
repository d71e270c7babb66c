//! Minimal view of Kubernetes manifests found in a must-gather.

use std::path::Path;

use mgc_core::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubeResource {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Only set on `List` kinds.
    #[serde(default)]
    pub items: Vec<KubeResource>,
}

impl KubeResource {
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    fn is_resource(&self) -> bool {
        !self.api_version.is_empty() && !self.kind.is_empty()
    }

    /// Parse every document in `text`. Lists are flattened into their items.
    /// Documents that are not Kubernetes objects are skipped.
    pub fn parse_all(text: &str) -> Vec<KubeResource> {
        let mut resources = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            match KubeResource::deserialize(document) {
                Ok(resource) if resource.is_resource() => resource.flatten_into(&mut resources),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "document is not a Kubernetes object");
                }
            }
        }
        resources
    }

    fn flatten_into(self, out: &mut Vec<KubeResource>) {
        if self.items.is_empty() {
            out.push(self);
            return;
        }
        for item in self.items {
            if item.is_resource() {
                item.flatten_into(out);
            }
        }
    }
}

/// YAML and JSON manifests are both parsed; anything else has no resources.
pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("json")
        })
        .unwrap_or(false)
}

/// Load the resources in a manifest file.
pub fn load(path: &Path) -> Result<Vec<KubeResource>> {
    let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
    Ok(KubeResource::parse_all(&String::from_utf8_lossy(&bytes)))
}
