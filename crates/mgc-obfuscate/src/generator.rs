//! Replacement value generators
//!
//! A [`Generator`] is configured once as either [`ReplacementType::Consistent`]
//! (a numbered printf-style template such as `x-ipv4-%010d-x`) or
//! [`ReplacementType::Static`] (one fixed placeholder). The counter only ever
//! grows; running past the ceiling is a fatal condition.

use std::sync::atomic::{AtomicU64, Ordering};

use mgc_core::{Error, FatalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementType {
    #[default]
    Static,
    Consistent,
}

/// Parsed `prefix%0Nd suffix` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    prefix: String,
    width: usize,
    suffix: String,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Template {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let start = raw
            .find('%')
            .ok_or_else(|| invalid("missing %d placeholder"))?;
        let rest = &raw[start + 1..];
        let digits_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let digits = &rest[..digits_len];
        if !rest[digits_len..].starts_with('d') {
            return Err(invalid("placeholder must be %d or %0Nd"));
        }
        if !digits.is_empty() && !digits.starts_with('0') {
            return Err(invalid("only zero padding is supported"));
        }
        let width = if digits.is_empty() {
            0
        } else {
            digits
                .parse::<usize>()
                .map_err(|_| invalid("bad placeholder width"))?
        };
        if width > 19 {
            return Err(invalid("placeholder width must be at most 19"));
        }

        let suffix = &rest[digits_len + 1..];
        if suffix.contains('%') {
            return Err(invalid("only one placeholder is allowed"));
        }

        Ok(Self {
            raw: raw.to_string(),
            prefix: raw[..start].to_string(),
            width,
            suffix: suffix.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, n: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            n,
            self.suffix,
            width = self.width
        )
    }

    /// Largest counter value that still fits the zero-padded width.
    pub fn capacity(&self) -> u64 {
        if self.width == 0 {
            u64::MAX
        } else {
            10u64.saturating_pow(self.width as u32) - 1
        }
    }

    /// Recover the counter from a value this template rendered.
    pub fn counter_of(&self, value: &str) -> Option<u64> {
        let digits = value
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

#[derive(Debug)]
pub struct Generator {
    mode: ReplacementType,
    template: Option<Template>,
    static_value: String,
    counter: AtomicU64,
    max_count: u64,
}

impl Generator {
    /// Build a generator for `mode`. The template is only parsed and checked
    /// in consistent mode; `max_count` defaults to the template capacity.
    pub fn new(
        mode: ReplacementType,
        template: &str,
        static_value: &str,
        max_count: Option<u64>,
    ) -> Result<Self> {
        match mode {
            ReplacementType::Consistent => Self::consistent(template, max_count),
            ReplacementType::Static => Ok(Self::fixed(static_value)),
        }
    }

    pub fn consistent(template: &str, max_count: Option<u64>) -> Result<Self> {
        let template = Template::parse(template)?;
        let capacity = template.capacity();
        let max_count = match max_count {
            Some(0) => {
                return Err(Error::Config(
                    "max replacements must be at least 1".to_string(),
                ));
            }
            Some(max) if max > capacity => {
                return Err(Error::Config(format!(
                    "max replacements {} exceeds the {} values template {:?} can render",
                    max,
                    capacity,
                    template.as_str()
                )));
            }
            Some(max) => max,
            None => capacity,
        };

        Ok(Self {
            mode: ReplacementType::Consistent,
            template: Some(template),
            static_value: String::new(),
            counter: AtomicU64::new(0),
            max_count,
        })
    }

    pub fn fixed(static_value: &str) -> Self {
        Self {
            mode: ReplacementType::Static,
            template: None,
            static_value: static_value.to_string(),
            counter: AtomicU64::new(0),
            max_count: u64::MAX,
        }
    }

    pub fn mode(&self) -> ReplacementType {
        self.mode
    }

    /// Number of consistent values handed out so far.
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst).min(self.max_count)
    }

    pub fn generate(&self) -> Result<String> {
        match self.mode {
            ReplacementType::Consistent => self.generate_consistent(),
            ReplacementType::Static => Ok(self.generate_static()),
        }
    }

    pub fn generate_consistent(&self) -> Result<String> {
        let Some(template) = &self.template else {
            return Ok(self.generate_static());
        };
        let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if next > self.max_count {
            return Err(FatalError::GeneratorExhausted {
                template: template.as_str().to_string(),
                max: self.max_count,
            }
            .into());
        }
        Ok(template.render(next))
    }

    pub fn generate_static(&self) -> String {
        self.static_value.clone()
    }

    /// Whether `value` has the shape this generator's template renders.
    pub fn recognizes(&self, value: &str) -> bool {
        self.template
            .as_ref()
            .is_some_and(|t| t.counter_of(value).is_some())
    }

    /// Move the counter past a value issued by an earlier run so seeded
    /// replacements are never handed out twice.
    pub fn observe(&self, value: &str) {
        if let Some(n) = self.template.as_ref().and_then(|t| t.counter_of(value)) {
            self.counter.fetch_max(n, Ordering::SeqCst);
        }
    }
}
