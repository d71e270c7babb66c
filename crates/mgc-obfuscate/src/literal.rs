//! Literal substring → replacement maps.
//!
//! `keywords` and `exact` share this implementation; they only differ in
//! where the map comes from (inline configuration vs. an external map file).

use std::collections::BTreeMap;

use mgc_core::{Error, Result};

use crate::{Obfuscator, ReplacementTracker, ReportingObfuscator};

pub struct LiteralObfuscator {
    kind: &'static str,
    /// Longest key first so a shorter key never splits a longer one.
    pairs: Vec<(String, String)>,
    tracker: ReplacementTracker,
}

impl LiteralObfuscator {
    pub fn keywords(replacements: BTreeMap<String, String>) -> Result<Self> {
        Self::new("keywords", replacements)
    }

    pub fn exact(replacements: BTreeMap<String, String>) -> Result<Self> {
        Self::new("exact", replacements)
    }

    fn new(kind: &'static str, replacements: BTreeMap<String, String>) -> Result<Self> {
        if replacements.is_empty() {
            return Err(Error::Config(format!("{} obfuscator has no replacements", kind)));
        }
        for (original, replacement) in &replacements {
            if original.is_empty() {
                return Err(Error::Config(format!("{} obfuscator has an empty key", kind)));
            }
            if replacement.contains(original.as_str()) {
                return Err(Error::Config(format!(
                    "{} replacement {:?} contains the value it replaces",
                    kind, replacement
                )));
            }
        }

        let mut pairs: Vec<(String, String)> = replacements.into_iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            kind,
            pairs,
            tracker: ReplacementTracker::new(),
        })
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        let mut output = input.to_string();
        for (original, replacement) in &self.pairs {
            let count = output.matches(original.as_str()).count() as u64;
            if count == 0 {
                continue;
            }
            self.tracker
                .add_replacement(original, original, replacement, count)?;
            output = output.replace(original.as_str(), replacement);
        }
        Ok(output)
    }
}

impl Obfuscator for LiteralObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for LiteralObfuscator {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }
}
