//! Configured domain names and their subdomains.
//!
//! Only the base domain is replaced: `api.example.com` becomes
//! `api.domain0000001` and every other subdomain of `example.com` gets the
//! same base token.

use std::collections::HashMap;

use mgc_core::{Error, ReplacementReport, Result};
use parking_lot::Mutex;
use regex::Regex;

use crate::obfuscator::replace_spans;
use crate::{Generator, Obfuscator, ReplacementTracker, ReplacementType, ReportingObfuscator};

pub const DOMAIN_TEMPLATE: &str = "domain%07d";
pub const STATIC_DOMAIN: &str = "obfuscated-domain";

struct DomainPattern {
    domain: String,
    regex: Regex,
}

pub struct DomainObfuscator {
    patterns: Vec<DomainPattern>,
    generator: Generator,
    /// Lowercased base domain → token.
    tokens: Mutex<HashMap<String, String>>,
    tracker: ReplacementTracker,
}

impl DomainObfuscator {
    pub fn new(domains: &[String], mode: ReplacementType, max_count: Option<u64>) -> Result<Self> {
        if domains.is_empty() {
            return Err(Error::Config(
                "domain obfuscator needs at least one domain name".to_string(),
            ));
        }

        let mut patterns = Vec::with_capacity(domains.len());
        for raw in domains {
            let domain = raw.trim().trim_start_matches("*.").trim_matches('.').to_lowercase();
            if domain.is_empty() {
                return Err(Error::Config(format!("invalid domain name {:?}", raw)));
            }
            let pattern = format!(
                r"(?i)(?P<prefix>(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)*){}",
                regex::escape(&domain)
            );
            let regex = Regex::new(&pattern).map_err(|e| Error::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            patterns.push(DomainPattern { domain, regex });
        }
        // Longest domain first so `sub.example.com` wins over `example.com`.
        patterns.sort_by(|a, b| b.domain.len().cmp(&a.domain.len()).then(a.domain.cmp(&b.domain)));

        Ok(Self {
            patterns,
            generator: Generator::new(mode, DOMAIN_TEMPLATE, STATIC_DOMAIN, max_count)?,
            tokens: Mutex::new(HashMap::new()),
            tracker: ReplacementTracker::new(),
        })
    }

    fn base_token(&self, domain: &str) -> Result<String> {
        let mut tokens = self.tokens.lock();
        if let Some(token) = tokens.get(domain) {
            return Ok(token.clone());
        }
        let token = self.generator.generate()?;
        tokens.insert(domain.to_string(), token.clone());
        Ok(token)
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        let mut output = input.to_string();
        for pattern in &self.patterns {
            let current = output.clone();
            // Matched text → its subdomain prefix. Case folding can change
            // byte lengths, so the prefix comes from the capture, not from
            // the length of the configured name.
            let mut prefixes: HashMap<&str, &str> = HashMap::new();
            let mut spans = Vec::new();
            for caps in pattern.regex.captures_iter(&current) {
                let (Some(m), Some(prefix)) = (caps.get(0), caps.name("prefix")) else {
                    continue;
                };
                if !is_whole_domain(&current, m.start(), m.end()) {
                    continue;
                }
                prefixes.insert(m.as_str(), &current[m.start()..prefix.end()]);
                spans.push((m.start(), m.end()));
            }
            if spans.is_empty() {
                continue;
            }

            output = replace_spans(&current, &spans, |matched, count| {
                let prefix = prefixes.get(matched).copied().unwrap_or_default();
                self.tracker
                    .generate_if_absent(matched, matched, count, || {
                        Ok(format!("{}{}", prefix, self.base_token(&pattern.domain)?))
                    })
                    .map(Some)
            })?;
        }
        Ok(output)
    }
}

/// Reject matches glued to surrounding name characters, e.g. the
/// `example.com` inside `notexample.com` or `example.community`.
fn is_whole_domain(line: &str, start: usize, end: usize) -> bool {
    let joins = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    let before = line[..start].chars().next_back();
    let after = line[end..].chars().next();
    !before.is_some_and(|c| joins(c) || c == '.') && !after.is_some_and(joins)
}

impl Obfuscator for DomainObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for DomainObfuscator {
    fn kind(&self) -> &'static str {
        "domain"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.tracker.initialize(report)?;
        let mut tokens = self.tokens.lock();
        for r in &report.replacements {
            let Some((pattern, prefix)) = self.patterns.iter().find_map(|p| {
                let caps = p.regex.captures(&r.canonical)?;
                let whole = caps.get(0)?;
                (whole.start() == 0 && whole.end() == r.canonical.len())
                    .then(|| (p, caps.name("prefix").map_or(0, |m| m.end())))
            }) else {
                continue;
            };
            if let Some(token) = r.replaced_with.get(prefix..) {
                self.generator.observe(token);
                tokens
                    .entry(pattern.domain.clone())
                    .or_insert_with(|| token.to_string());
            }
        }
        Ok(())
    }
}
