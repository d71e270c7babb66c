//! Obfuscator capabilities and composition.

use std::collections::BTreeMap;

use mgc_core::{Error, ObfuscatorReport, ReplacementReport, Result};
use regex::Regex;

use crate::ReplacementTracker;

/// Rewrites one line of text at a time.
pub trait Obfuscator: Send + Sync {
    /// Obfuscate a relative file path.
    fn path(&self, input: &str) -> Result<String>;

    /// Obfuscate a single line of file contents (no trailing newline).
    fn contents(&self, input: &str) -> Result<String>;
}

/// An obfuscator that records what it replaced.
pub trait ReportingObfuscator: Obfuscator {
    /// Short name used in reports, e.g. `ip` or `azure`.
    fn kind(&self) -> &'static str;

    fn tracker(&self) -> &ReplacementTracker;

    fn report(&self) -> ReplacementReport {
        self.tracker().report()
    }

    /// Seed from a previous run's report for this obfuscator.
    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.tracker().initialize(report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    Path,
    Contents,
    #[default]
    All,
}

/// Restricts an obfuscator to paths, contents, or both.
pub struct TargetFilter {
    inner: Box<dyn ReportingObfuscator>,
    target: Target,
}

impl TargetFilter {
    pub fn new(inner: Box<dyn ReportingObfuscator>, target: Target) -> Self {
        Self { inner, target }
    }

    pub fn target(&self) -> Target {
        self.target
    }
}

impl Obfuscator for TargetFilter {
    fn path(&self, input: &str) -> Result<String> {
        match self.target {
            Target::Path | Target::All => self.inner.path(input),
            Target::Contents => Ok(input.to_string()),
        }
    }

    fn contents(&self, input: &str) -> Result<String> {
        match self.target {
            Target::Contents | Target::All => self.inner.contents(input),
            Target::Path => Ok(input.to_string()),
        }
    }
}

impl ReportingObfuscator for TargetFilter {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    fn tracker(&self) -> &ReplacementTracker {
        self.inner.tracker()
    }

    fn report(&self) -> ReplacementReport {
        self.inner.report()
    }

    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.inner.initialize(report)
    }
}

/// Applies obfuscators in configured order, each one seeing the previous
/// one's output.
#[derive(Default)]
pub struct Sequence {
    obfuscators: Vec<Box<dyn ReportingObfuscator>>,
}

impl Sequence {
    pub fn new(obfuscators: Vec<Box<dyn ReportingObfuscator>>) -> Self {
        Self { obfuscators }
    }

    pub fn len(&self) -> usize {
        self.obfuscators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obfuscators.is_empty()
    }

    /// One report per obfuscator, in sequence order.
    pub fn reports(&self) -> Vec<ObfuscatorReport> {
        self.obfuscators
            .iter()
            .map(|o| ObfuscatorReport {
                kind: o.kind().to_string(),
                replacements: o.report(),
            })
            .collect()
    }

    /// Seed each obfuscator from the report at the same position. Kinds must
    /// line up; extra or missing entries are a configuration error.
    pub fn initialize(&self, reports: &[ObfuscatorReport]) -> Result<()> {
        if reports.len() != self.obfuscators.len() {
            return Err(Error::Config(format!(
                "seed report has {} obfuscators, configuration has {}",
                reports.len(),
                self.obfuscators.len()
            )));
        }
        for (idx, (obfuscator, report)) in self.obfuscators.iter().zip(reports).enumerate() {
            if obfuscator.kind() != report.kind {
                return Err(Error::Config(format!(
                    "seed report entry {} is {:?}, configuration expects {:?}",
                    idx,
                    report.kind,
                    obfuscator.kind()
                )));
            }
            obfuscator.initialize(&report.replacements)?;
            tracing::debug!(
                kind = obfuscator.kind(),
                entries = report.replacements.len(),
                "seeded obfuscator"
            );
        }
        Ok(())
    }
}

impl Obfuscator for Sequence {
    fn path(&self, input: &str) -> Result<String> {
        let mut output = input.to_string();
        for obfuscator in &self.obfuscators {
            output = obfuscator.path(&output)?;
        }
        Ok(output)
    }

    fn contents(&self, input: &str) -> Result<String> {
        let mut output = input.to_string();
        for obfuscator in &self.obfuscators {
            output = obfuscator.contents(&output)?;
        }
        Ok(output)
    }
}

/// Replace every non-empty match of `regex` in `input`.
///
/// `replace` is called once per distinct matched text with the number of
/// times it occurs in the line; returning `None` leaves that text untouched.
pub(crate) fn replace_matches<F>(regex: &Regex, input: &str, replace: F) -> Result<String>
where
    F: FnMut(&str, u64) -> Result<Option<String>>,
{
    let spans: Vec<(usize, usize)> = regex
        .find_iter(input)
        .filter(|m| !m.is_empty())
        .map(|m| (m.start(), m.end()))
        .collect();
    replace_spans(input, &spans, replace)
}

/// Replace the given byte ranges of `input`, which must be ordered and
/// disjoint.
///
/// Callers that accept or reject matches by position pass only the accepted
/// spans; text outside them is never touched, even if it reads the same.
pub(crate) fn replace_spans<F>(input: &str, spans: &[(usize, usize)], mut replace: F) -> Result<String>
where
    F: FnMut(&str, u64) -> Result<Option<String>>,
{
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for &(start, end) in spans {
        *counts.entry(&input[start..end]).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Ok(input.to_string());
    }

    let mut replacements: BTreeMap<&str, String> = BTreeMap::new();
    for (matched, count) in counts {
        if let Some(replacement) = replace(matched, count)? {
            replacements.insert(matched, replacement);
        }
    }

    let mut output = String::with_capacity(input.len());
    let mut last = 0;
    for &(start, end) in spans {
        if let Some(replacement) = replacements.get(&input[start..end]) {
            output.push_str(&input[last..start]);
            output.push_str(replacement);
            last = end;
        }
    }
    output.push_str(&input[last..]);
    Ok(output)
}

/// True when the characters around `start..end` do not continue the match.
pub(crate) fn is_isolated(input: &str, start: usize, end: usize, joins: fn(char) -> bool) -> bool {
    let before = input[..start].chars().next_back();
    let after = input[end..].chars().next();
    !before.is_some_and(joins) && !after.is_some_and(joins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Generator, LiteralObfuscator, RegexObfuscator, ReplacementType};

    fn keywords(pairs: &[(&str, &str)]) -> Box<dyn ReportingObfuscator> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Box::new(LiteralObfuscator::keywords(map).unwrap())
    }

    #[test]
    fn test_sequence_order_matters() {
        let regex = RegexObfuscator::new(
            "secret-[0-9]+",
            Generator::new(ReplacementType::Static, "", "x-regex-x", None).unwrap(),
        )
        .unwrap();
        let seq = Sequence::new(vec![keywords(&[("password", "secret-1")]), Box::new(regex)]);

        assert_eq!(seq.contents("password here").unwrap(), "x-regex-x here");
        let reports = seq.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, "keywords");
        assert_eq!(reports[1].kind, "regex");
        assert_eq!(reports[1].replacements.len(), 1);
    }

    #[test]
    fn test_target_filter_gates_and_does_not_record() {
        let path_only = TargetFilter::new(keywords(&[("alpha", "beta")]), Target::Path);
        assert_eq!(path_only.contents("alpha").unwrap(), "alpha");
        assert!(path_only.report().is_empty());
        assert_eq!(path_only.path("dir/alpha.log").unwrap(), "dir/beta.log");
        assert_eq!(path_only.report().len(), 1);

        let contents_only = TargetFilter::new(keywords(&[("alpha", "beta")]), Target::Contents);
        assert_eq!(contents_only.path("alpha").unwrap(), "alpha");
        assert_eq!(contents_only.contents("alpha").unwrap(), "beta");
    }

    #[test]
    fn test_initialize_checks_kinds() {
        let seq = Sequence::new(vec![keywords(&[("a", "b")])]);
        let wrong = vec![ObfuscatorReport {
            kind: "ip".to_string(),
            replacements: ReplacementReport::default(),
        }];
        assert!(seq.initialize(&wrong).is_err());
        assert!(seq.initialize(&[]).is_err());
    }

    #[test]
    fn test_replace_matches_skips_declined() {
        let re = Regex::new(r"[0-9]+").unwrap();
        let out = replace_matches(&re, "1 22 1 333", |m, count| {
            Ok((m != "22").then(|| format!("<{}x{}>", m, count)))
        })
        .unwrap();
        assert_eq!(out, "<1x2> 22 <1x2> <333x1>");
    }

    #[test]
    fn test_replace_spans_only_touches_given_ranges() {
        let out = replace_spans("ab ab ab", &[(0, 2), (6, 8)], |m, count| {
            Ok(Some(format!("{}{}", m.to_uppercase(), count)))
        })
        .unwrap();
        assert_eq!(out, "AB2 ab AB2");
        assert_eq!(replace_spans("ab", &[], |_, _| Ok(Some("x".into()))).unwrap(), "ab");
    }

    #[test]
    fn test_is_isolated() {
        let word = |c: char| c.is_ascii_alphanumeric();
        assert!(is_isolated("a b c", 2, 3, word));
        assert!(!is_isolated("abc", 1, 2, word));
        assert!(is_isolated("b", 0, 1, word));
    }
}
