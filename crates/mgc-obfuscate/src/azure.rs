//! Azure resource identifiers.
//!
//! Resource IDs nest (subscription, resource group, resource, subresource)
//! and the same name can show up outside of any ID on the same line, so a
//! single regex pass is not enough. Each line goes through the replacers from
//! most to least specific, then every name seen so far is looked up again
//! literally and replaced where it still appears.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use mgc_core::{Error, ReplacementReport, Result};
use parking_lot::Mutex;
use regex::Regex;

use crate::{Generator, Obfuscator, ReplacementTracker, ReportingObfuscator};

/// Anything this obfuscator (or any other consistent obfuscator) emitted.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"x-[a-z]+(?:-[a-z]+)*-[0-9]+-x").unwrap());
static WHOLE_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^x-[a-z]+(?:-[a-z]+)*-[0-9]+-x$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Subresource,
    Resource,
    ResourceGroup,
    Subscription,
    NodePool,
    ClusterId,
}

impl ResourceKind {
    /// Most specific first; this is also the replacer order.
    const ALL: [ResourceKind; 6] = [
        ResourceKind::Subresource,
        ResourceKind::Resource,
        ResourceKind::ResourceGroup,
        ResourceKind::Subscription,
        ResourceKind::NodePool,
        ResourceKind::ClusterId,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn template(self) -> &'static str {
        match self {
            ResourceKind::Subresource => "x-subresource-%07d-x",
            ResourceKind::Resource => "x-resource-%07d-x",
            ResourceKind::ResourceGroup => "x-resourcegroup-%07d-x",
            ResourceKind::Subscription => "x-subscription-%07d-x",
            ResourceKind::NodePool => "x-nodepool-%07d-x",
            ResourceKind::ClusterId => "x-clusterid-%07d-x",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            ResourceKind::Subresource => {
                r#"/providers/[^/\s]+/[^/\s]+/([^/\s"',;?]+)/[^/\s]+/([^/\s"',;?]+)"#
            }
            ResourceKind::Resource => r#"/providers/[^/\s]+/[^/\s]+/([^/\s"',;?]+)"#,
            ResourceKind::ResourceGroup => r#"(?i)/resourcegroups/([^/\s"',;?]+)"#,
            ResourceKind::Subscription => {
                r"(?i)/subscriptions/([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})"
            }
            ResourceKind::NodePool => r"\baks-([a-z][a-z0-9]{0,11})-[0-9]{8}-vmss",
            ResourceKind::ClusterId => r"\b([a-z0-9]{32})\b",
        }
    }

    /// Capture group → kind of the identifier it holds.
    fn captures(self) -> &'static [(usize, ResourceKind)] {
        match self {
            ResourceKind::Subresource => &[(1, ResourceKind::Resource), (2, ResourceKind::Subresource)],
            ResourceKind::Resource => &[(1, ResourceKind::Resource)],
            ResourceKind::ResourceGroup => &[(1, ResourceKind::ResourceGroup)],
            ResourceKind::Subscription => &[(1, ResourceKind::Subscription)],
            ResourceKind::NodePool => &[(1, ResourceKind::NodePool)],
            ResourceKind::ClusterId => &[(1, ResourceKind::ClusterId)],
        }
    }
}

/// One pattern of the ordered pass, with the names it has handed out.
struct PartialRegexReplacer {
    kind: ResourceKind,
    regex: Regex,
    generator: Generator,
    seen: Mutex<BTreeSet<String>>,
}

pub struct AzureObfuscator {
    replacers: Vec<PartialRegexReplacer>,
    tracker: ReplacementTracker,
}

impl AzureObfuscator {
    /// Always consistent: a static placeholder would erase the structure
    /// this obfuscator exists to keep.
    pub fn new(max_count: Option<u64>) -> Result<Self> {
        let replacers = ResourceKind::ALL
            .iter()
            .map(|&kind| {
                Ok(PartialRegexReplacer {
                    kind,
                    regex: Regex::new(kind.pattern()).map_err(|e| Error::Pattern {
                        pattern: kind.pattern().to_string(),
                        reason: e.to_string(),
                    })?,
                    generator: Generator::consistent(kind.template(), max_count)?,
                    seen: Mutex::new(BTreeSet::new()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            replacers,
            tracker: ReplacementTracker::new(),
        })
    }

    fn token(&self, kind: ResourceKind, canonical: &str, count: u64) -> Result<String> {
        let replacer = &self.replacers[kind.index()];
        let token = self
            .tracker
            .generate_if_absent(canonical, canonical, count, || {
                replacer.generator.generate_consistent()
            })?;
        replacer.seen.lock().insert(canonical.to_string());
        Ok(token)
    }

    fn apply(&self, replacer: &PartialRegexReplacer, line: &str) -> Result<String> {
        if !replacer.regex.is_match(line) {
            return Ok(line.to_string());
        }

        let mut output = String::with_capacity(line.len());
        let mut last = 0;
        for caps in replacer.regex.captures_iter(line) {
            for &(group, kind) in replacer.kind.captures() {
                let Some(m) = caps.get(group) else {
                    continue;
                };
                if m.is_empty() || WHOLE_TOKEN_REGEX.is_match(m.as_str()) {
                    continue;
                }
                let token = self.token(kind, m.as_str(), 1)?;
                output.push_str(&line[last..m.start()]);
                output.push_str(&token);
                last = m.end();
            }
        }
        output.push_str(&line[last..]);
        Ok(output)
    }

    /// Replace names from earlier matches that are still present in `line`.
    fn recover(&self, line: &str) -> Result<String> {
        let mut known: Vec<(String, ResourceKind)> = Vec::new();
        for replacer in &self.replacers {
            let seen = replacer.seen.lock();
            known.extend(
                seen.iter()
                    .filter(|canonical| line.contains(canonical.as_str()))
                    .map(|canonical| (canonical.clone(), replacer.kind)),
            );
        }
        if known.is_empty() {
            return Ok(line.to_string());
        }
        known.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        known.dedup_by(|a, b| a.0 == b.0);

        let mut output = line.to_string();
        for (canonical, kind) in known {
            let starts = free_occurrences(&output, &canonical);
            if starts.is_empty() {
                continue;
            }
            let token = self.token(kind, &canonical, starts.len() as u64)?;

            let mut rebuilt = String::with_capacity(output.len());
            let mut last = 0;
            for start in starts {
                rebuilt.push_str(&output[last..start]);
                rebuilt.push_str(&token);
                last = start + canonical.len();
            }
            rebuilt.push_str(&output[last..]);
            output = rebuilt;
        }
        Ok(output)
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        let mut output = input.to_string();
        for replacer in &self.replacers {
            output = self.apply(replacer, &output)?;
        }
        self.recover(&output)
    }
}

/// Start offsets of `needle` in `line` that do not fall inside an already
/// emitted token. Names glued to other text (`prod-rg-nsg`) are still
/// replaced: derived names carry the secret too.
fn free_occurrences(line: &str, needle: &str) -> Vec<usize> {
    let tokens: Vec<(usize, usize)> = TOKEN_REGEX
        .find_iter(line)
        .map(|m| (m.start(), m.end()))
        .collect();

    line.match_indices(needle)
        .map(|(start, _)| start)
        .filter(|&start| {
            let end = start + needle.len();
            !tokens.iter().any(|&(s, e)| start < e && end > s)
        })
        .collect()
}

impl Obfuscator for AzureObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for AzureObfuscator {
    fn kind(&self) -> &'static str {
        "azure"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.tracker.initialize(report)?;
        for r in &report.replacements {
            if let Some(replacer) = self
                .replacers
                .iter()
                .find(|p| p.generator.recognizes(&r.replaced_with))
            {
                replacer.generator.observe(&r.replaced_with);
                replacer.seen.lock().insert(r.canonical.clone());
            }
        }
        Ok(())
    }
}
