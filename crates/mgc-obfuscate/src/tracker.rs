//! Thread-safe registry of canonical values and their replacements.
//!
//! Entries are never removed or rewritten. A single lock covers the
//! check-then-insert so two workers that discover the same secret at the same
//! time still agree on one replacement.

use std::collections::HashMap;

use mgc_core::{FatalError, Replacement, ReplacementReport, Result};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct TrackerState {
    index: HashMap<String, usize>,
    replacements: Vec<Replacement>,
    initialized: bool,
    used: bool,
}

#[derive(Debug, Default)]
pub struct ReplacementTracker {
    state: Mutex<TrackerState>,
}

impl ReplacementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the replacement for `canonical`, calling `generate` only if the
    /// key has never been seen. `count` occurrences of `original` are recorded
    /// either way.
    pub fn generate_if_absent<F>(
        &self,
        canonical: &str,
        original: &str,
        count: u64,
        generate: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        let mut state = self.state.lock();
        state.used = true;

        if let Some(&idx) = state.index.get(canonical) {
            let entry = &mut state.replacements[idx];
            entry.record(original, count);
            return Ok(entry.replaced_with.clone());
        }

        let replacement = generate()?;
        state.insert(
            Replacement::new(canonical, replacement.clone()).with_occurrence(original, count),
        );
        Ok(replacement)
    }

    /// Record a replacement chosen outside the tracker (static placeholders,
    /// keyword maps). Reporting a different value for a known key is fatal.
    pub fn add_replacement(
        &self,
        canonical: &str,
        original: &str,
        replacement: &str,
        count: u64,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.used = true;

        if let Some(&idx) = state.index.get(canonical) {
            let entry = &mut state.replacements[idx];
            if entry.replaced_with != replacement {
                return Err(FatalError::TrackerConflict {
                    existing: entry.replaced_with.clone(),
                    attempted: replacement.to_string(),
                }
                .into());
            }
            entry.record(original, count);
            return Ok(());
        }

        state.insert(Replacement::new(canonical, replacement).with_occurrence(original, count));
        Ok(())
    }

    pub fn lookup(&self, canonical: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .index
            .get(canonical)
            .map(|&idx| state.replacements[idx].replaced_with.clone())
    }

    /// Seed from a previous run. Allowed once, before any other use.
    pub fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        let mut state = self.state.lock();
        if state.initialized || state.used {
            return Err(FatalError::TrackerAlreadyInitialized.into());
        }
        state.initialized = true;

        for replacement in &report.replacements {
            if let Some(&idx) = state.index.get(&replacement.canonical) {
                let entry = &mut state.replacements[idx];
                if entry.replaced_with != replacement.replaced_with {
                    return Err(FatalError::TrackerConflict {
                        existing: entry.replaced_with.clone(),
                        attempted: replacement.replaced_with.clone(),
                    }
                    .into());
                }
                for (original, count) in &replacement.occurrences {
                    entry.record(original.clone(), *count);
                }
                continue;
            }
            state.insert(replacement.clone());
        }
        Ok(())
    }

    /// Snapshot of everything recorded so far, in insertion order.
    pub fn report(&self) -> ReplacementReport {
        ReplacementReport::new(self.state.lock().replacements.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TrackerState {
    fn insert(&mut self, replacement: Replacement) {
        self.index
            .insert(replacement.canonical.clone(), self.replacements.len());
        self.replacements.push(replacement);
    }
}
