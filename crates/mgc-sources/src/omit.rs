//! Decide which files are left out of the cleaned output.

use glob::Pattern;
use mgc_core::{Error, Result};

use crate::KubeResource;

/// An omission rule. A rule answers only the questions it cares about; the
/// defaults keep everything.
pub trait Omitter: Send + Sync {
    /// `path` is relative to the input root, `/`-separated.
    fn omit_path(&self, _path: &str) -> Result<bool> {
        Ok(false)
    }

    fn omit_kube_resource(&self, _resource: &KubeResource) -> Result<bool> {
        Ok(false)
    }

    /// Whether manifests must be parsed for [`Omitter::omit_kube_resource`].
    fn inspects_resources(&self) -> bool {
        false
    }
}

/// Glob patterns matched against the relative path.
pub struct PathOmitter {
    patterns: Vec<Pattern>,
}

impl PathOmitter {
    /// Invalid glob syntax is an error, not a silently dropped rule.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| Error::Pattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if compiled.is_empty() {
            return Err(Error::Config("file omitter needs a pattern".to_string()));
        }
        Ok(Self { patterns: compiled })
    }

    /// First pattern matching `path`, for logging.
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(|p| p.as_str())
    }
}

impl Omitter for PathOmitter {
    fn omit_path(&self, path: &str) -> Result<bool> {
        Ok(self.patterns.iter().any(|pattern| pattern.matches(path)))
    }
}

/// Omits manifests holding a resource of one API version and kind,
/// optionally limited to some namespaces.
#[derive(Debug, Clone)]
pub struct KubernetesOmitter {
    api_version: String,
    kind: String,
    namespaces: Vec<String>,
}

impl KubernetesOmitter {
    pub fn new(api_version: &str, kind: &str, namespaces: Vec<String>) -> Result<Self> {
        if api_version.trim().is_empty() || kind.trim().is_empty() {
            return Err(Error::Config(
                "kubernetes omitter needs both api_version and kind".to_string(),
            ));
        }
        Ok(Self {
            api_version: api_version.trim().to_string(),
            kind: kind.trim().to_string(),
            namespaces,
        })
    }
}

impl Omitter for KubernetesOmitter {
    fn omit_kube_resource(&self, resource: &KubeResource) -> Result<bool> {
        if resource.api_version != self.api_version || !resource.kind.eq_ignore_ascii_case(&self.kind) {
            return Ok(false);
        }
        if self.namespaces.is_empty() {
            return Ok(true);
        }
        Ok(resource
            .namespace()
            .is_some_and(|ns| self.namespaces.iter().any(|n| n == ns)))
    }

    fn inspects_resources(&self) -> bool {
        true
    }
}
