//! MAC addresses written as six colon- or dash-separated hex octets.
//!
//! Bare twelve-digit hex strings are deliberately not matched: they are
//! indistinguishable from hash and UUID fragments.

use std::sync::LazyLock;

use mgc_core::{ReplacementReport, Result};
use regex::Regex;

use crate::obfuscator::{is_isolated, replace_spans};
use crate::{Generator, Obfuscator, ReplacementTracker, ReplacementType, ReportingObfuscator};

static MAC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[0-9a-f]{2}(?:[:-][0-9a-f]{2}){5}\b").unwrap());

pub const STATIC_MAC: &str = "xx:xx:xx:xx:xx:xx";
pub const MAC_TEMPLATE: &str = "x-mac-%010d-x";

pub struct MacObfuscator {
    generator: Generator,
    tracker: ReplacementTracker,
}

impl MacObfuscator {
    pub fn new(mode: ReplacementType, max_count: Option<u64>) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(mode, MAC_TEMPLATE, STATIC_MAC, max_count)?,
            tracker: ReplacementTracker::new(),
        })
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        // Longer colon/dash runs (IPv6, WWNs) are not MACs.
        let joins = |c: char| c == ':' || c == '-' || c.is_ascii_alphanumeric();
        let spans: Vec<(usize, usize)> = MAC_REGEX
            .find_iter(input)
            .filter(|m| is_isolated(input, m.start(), m.end(), joins))
            .map(|m| (m.start(), m.end()))
            .collect();

        replace_spans(input, &spans, |candidate, count| {
            let canonical = candidate.to_ascii_lowercase().replace('-', ":");
            self.tracker
                .generate_if_absent(&canonical, candidate, count, || self.generator.generate())
                .map(Some)
        })
    }
}

impl Obfuscator for MacObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for MacObfuscator {
    fn kind(&self) -> &'static str {
        "mac"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.tracker.initialize(report)?;
        for r in &report.replacements {
            self.generator.observe(&r.replaced_with);
        }
        Ok(())
    }
}
