use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Cleaning run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Applied in order; each one sees the previous one's output.
    #[serde(default)]
    pub obfuscate: Vec<ObfuscateConfig>,

    #[serde(default)]
    pub omit: Vec<OmitConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObfuscateType {
    Ip,
    Mac,
    Domain,
    Keywords,
    Exact,
    Regex,
    ClusterId,
    SshKey,
    Azure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObfuscateTarget {
    Path,
    Contents,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementMode {
    #[default]
    Static,
    Consistent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObfuscateConfig {
    #[serde(rename = "type")]
    pub kind: ObfuscateType,

    #[serde(default)]
    pub target: ObfuscateTarget,

    /// Unset means static, except for `azure` which is always consistent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_type: Option<ReplacementMode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_names: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replacement: BTreeMap<String, String>,

    /// JSON object of original → replacement, for `exact`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replacements: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmitType {
    File,
    Kubernetes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OmitConfig {
    #[serde(rename = "type")]
    pub kind: OmitType,

    /// Glob matched against the path relative to the input root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_resource: Option<KubernetesResourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KubernetesResourceConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            obfuscate: vec![
                ObfuscateConfig::new(ObfuscateType::Ip),
                ObfuscateConfig::new(ObfuscateType::Mac),
            ],
            omit: Vec::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl ObfuscateConfig {
    pub fn new(kind: ObfuscateType) -> Self {
        Self {
            kind,
            target: ObfuscateTarget::default(),
            replacement_type: None,
            domain_names: Vec::new(),
            replacement: BTreeMap::new(),
            replacement_file: None,
            regex: None,
            max_replacements: None,
        }
    }

    pub fn replacement_mode(&self) -> ReplacementMode {
        match (self.kind, self.replacement_type) {
            (_, Some(mode)) => mode,
            (ObfuscateType::Azure, None) => ReplacementMode::Consistent,
            (_, None) => ReplacementMode::Static,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let kind = self.kind;
        let unexpected = |field: &str| anyhow::anyhow!("{:?} obfuscator does not take {}", kind, field);

        if kind != ObfuscateType::Domain && !self.domain_names.is_empty() {
            return Err(unexpected("domain_names"));
        }
        if !matches!(kind, ObfuscateType::Keywords | ObfuscateType::Exact) && !self.replacement.is_empty() {
            return Err(unexpected("replacement"));
        }
        if kind != ObfuscateType::Exact && self.replacement_file.is_some() {
            return Err(unexpected("replacement_file"));
        }
        if kind != ObfuscateType::Regex && self.regex.is_some() {
            return Err(unexpected("regex"));
        }
        if self.max_replacements == Some(0) {
            bail!("max_replacements must be at least 1");
        }

        match kind {
            ObfuscateType::Domain => {
                if self.domain_names.is_empty() {
                    bail!("domain obfuscator needs at least one entry in domain_names");
                }
                if self.domain_names.iter().any(|d| d.trim().is_empty()) {
                    bail!("domain_names contains an empty name");
                }
            }
            ObfuscateType::Keywords => {
                if self.replacement.is_empty() {
                    bail!("keywords obfuscator needs a replacement table");
                }
            }
            ObfuscateType::Exact => {
                if self.replacement.is_empty() && self.replacement_file.is_none() {
                    bail!("exact obfuscator needs replacement or replacement_file");
                }
            }
            ObfuscateType::Regex => {
                if self.regex.as_deref().is_none_or(|r| r.trim().is_empty()) {
                    bail!("regex obfuscator needs a non-empty regex");
                }
            }
            ObfuscateType::Azure => {
                if self.replacement_type == Some(ReplacementMode::Static) {
                    bail!("azure obfuscator only supports consistent replacement");
                }
            }
            ObfuscateType::Ip | ObfuscateType::Mac | ObfuscateType::ClusterId | ObfuscateType::SshKey => {}
        }

        for (original, replacement) in &self.replacement {
            if original.is_empty() {
                bail!("{:?} replacement table has an empty key", kind);
            }
            if replacement.contains(original.as_str()) {
                bail!("replacement for {:?} would leak the value it replaces", original);
            }
        }
        Ok(())
    }
}

impl OmitConfig {
    fn validate(&self) -> anyhow::Result<()> {
        match self.kind {
            OmitType::File => {
                if self.pattern.as_deref().is_none_or(|p| p.trim().is_empty()) {
                    bail!("file omitter needs a pattern");
                }
                if self.kubernetes_resource.is_some() {
                    bail!("file omitter does not take kubernetes_resource");
                }
            }
            OmitType::Kubernetes => {
                let Some(resource) = &self.kubernetes_resource else {
                    bail!("kubernetes omitter needs a [omit.kubernetes_resource] table");
                };
                if resource.api_version.trim().is_empty() || resource.kind.trim().is_empty() {
                    bail!("kubernetes_resource needs api_version and kind");
                }
                if self.pattern.is_some() {
                    bail!("kubernetes omitter does not take pattern");
                }
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load and validate a config file. Relative `replacement_file` paths
    /// are resolved against the file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for entry in &mut config.obfuscate {
            if let Some(file) = &entry.replacement_file {
                if file.is_relative() {
                    entry.replacement_file = Some(base.join(file));
                }
            }
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that need no file system access.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        for (idx, entry) in self.obfuscate.iter().enumerate() {
            entry
                .validate()
                .with_context(|| format!("obfuscate entry {}", idx + 1))?;
        }
        for (idx, entry) in self.omit.iter().enumerate() {
            entry
                .validate()
                .with_context(|| format!("omit entry {}", idx + 1))?;
        }
        Ok(())
    }
}
