//! Turn a [`Config`] into the obfuscator chain and omission rules.

use std::collections::BTreeMap;
use std::path::Path;

use mgc_config::{
    Config, ObfuscateConfig, ObfuscateTarget, ObfuscateType, OmitConfig, OmitType, ReplacementMode,
};
use mgc_core::{Error, Result};
use mgc_obfuscate::{
    AzureObfuscator, DomainObfuscator, Generator, IpObfuscator, LiteralObfuscator, MacObfuscator,
    RegexObfuscator, ReplacementType, ReportingObfuscator, Sequence, SshKeyObfuscator, Target,
    TargetFilter,
    pattern::{REGEX_TEMPLATE, STATIC_REGEX},
};
use mgc_sources::{KubernetesOmitter, Omitter, PathOmitter};

/// Obfuscators in configured order.
pub fn obfuscators(config: &Config) -> Result<Sequence> {
    let chain = config
        .obfuscate
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            obfuscator(entry).map_err(|e| {
                Error::Config(format!("obfuscate entry {} ({:?}): {}", idx + 1, entry.kind, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Sequence::new(chain))
}

/// Omission rules in configured order.
pub fn omitters(config: &Config) -> Result<Vec<Box<dyn Omitter>>> {
    config.omit.iter().map(omitter).collect()
}

fn mode(entry: &ObfuscateConfig) -> ReplacementType {
    match entry.replacement_mode() {
        ReplacementMode::Static => ReplacementType::Static,
        ReplacementMode::Consistent => ReplacementType::Consistent,
    }
}

fn obfuscator(entry: &ObfuscateConfig) -> Result<Box<dyn ReportingObfuscator>> {
    let mode = mode(entry);
    let max = entry.max_replacements;

    let inner: Box<dyn ReportingObfuscator> = match entry.kind {
        ObfuscateType::Ip => Box::new(IpObfuscator::new(mode, max)?),
        ObfuscateType::Mac => Box::new(MacObfuscator::new(mode, max)?),
        ObfuscateType::Domain => Box::new(DomainObfuscator::new(&entry.domain_names, mode, max)?),
        ObfuscateType::Keywords => Box::new(LiteralObfuscator::keywords(entry.replacement.clone())?),
        ObfuscateType::Exact => {
            let mut replacements = entry.replacement.clone();
            if let Some(path) = &entry.replacement_file {
                replacements.extend(load_replacement_file(path)?);
            }
            Box::new(LiteralObfuscator::exact(replacements)?)
        }
        ObfuscateType::Regex => {
            let pattern = entry.regex.as_deref().unwrap_or_default();
            let generator = Generator::new(mode, REGEX_TEMPLATE, STATIC_REGEX, max)?;
            Box::new(RegexObfuscator::new(pattern, generator)?)
        }
        ObfuscateType::ClusterId => Box::new(RegexObfuscator::cluster_id(mode, max)?),
        ObfuscateType::SshKey => Box::new(SshKeyObfuscator::new(mode, max)?),
        ObfuscateType::Azure => {
            if mode == ReplacementType::Static {
                return Err(Error::Config(
                    "azure obfuscator only supports consistent replacement".to_string(),
                ));
            }
            Box::new(AzureObfuscator::new(max)?)
        }
    };

    let target = match entry.target {
        ObfuscateTarget::All => return Ok(inner),
        ObfuscateTarget::Path => Target::Path,
        ObfuscateTarget::Contents => Target::Contents,
    };
    Ok(Box::new(TargetFilter::new(inner, target)))
}

/// A flat JSON object of original → replacement.
pub fn load_replacement_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::at_path(path, e.into()))
}

fn omitter(entry: &OmitConfig) -> Result<Box<dyn Omitter>> {
    match entry.kind {
        OmitType::File => {
            let pattern = entry
                .pattern
                .clone()
                .ok_or_else(|| Error::Config("file omitter needs a pattern".to_string()))?;
            Ok(Box::new(PathOmitter::new(&[pattern])?))
        }
        OmitType::Kubernetes => {
            let resource = entry.kubernetes_resource.as_ref().ok_or_else(|| {
                Error::Config("kubernetes omitter needs kubernetes_resource".to_string())
            })?;
            Ok(Box::new(KubernetesOmitter::new(
                &resource.api_version,
                &resource.kind,
                resource.namespaces.clone(),
            )?))
        }
    }
}
