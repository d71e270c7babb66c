//! Single-pattern obfuscators keyed by the matched text.

use mgc_core::{Error, ReplacementReport, Result};
use regex::Regex;

use crate::obfuscator::replace_matches;
use crate::{Generator, Obfuscator, ReplacementTracker, ReportingObfuscator};

pub const REGEX_TEMPLATE: &str = "x-regex-%010d-x";
pub const STATIC_REGEX: &str = "x-regex-x";

/// Matches of one regular expression, each distinct match getting its own
/// tracked replacement. The catch-all `.*` treats the whole line as one
/// value.
pub struct RegexObfuscator {
    kind: &'static str,
    regex: Regex,
    whole_line: bool,
    generator: Generator,
    tracker: ReplacementTracker,
}

impl RegexObfuscator {
    pub fn new(pattern: &str, generator: Generator) -> Result<Self> {
        Self::with_kind("regex", pattern, generator)
    }

    pub(crate) fn with_kind(
        kind: &'static str,
        pattern: &str,
        generator: Generator,
    ) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(Error::Pattern {
                pattern: pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }
        let regex = Regex::new(pattern).map_err(|e| Error::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            kind,
            regex,
            whole_line: pattern.trim() == ".*",
            generator,
            tracker: ReplacementTracker::new(),
        })
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        if self.whole_line {
            if input.is_empty() {
                return Ok(String::new());
            }
            return self
                .tracker
                .generate_if_absent(input, input, 1, || self.generator.generate());
        }

        replace_matches(&self.regex, input, |matched, count| {
            self.tracker
                .generate_if_absent(matched, matched, count, || self.generator.generate())
                .map(Some)
        })
    }
}

impl Obfuscator for RegexObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for RegexObfuscator {
    fn kind(&self) -> &'static str {
        self.kind
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
