use mgc_core::Report;
use mgc_obfuscate::Sequence;
use parking_lot::Mutex;

/// Collects omissions while workers run and assembles the final [`Report`]
/// once they are done.
#[derive(Debug, Default)]
pub struct Reporter {
    omissions: Mutex<Vec<String>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omit(&self, relative: impl Into<String>) {
        self.omissions.lock().push(relative.into());
    }

    pub fn omitted(&self) -> usize {
        self.omissions.lock().len()
    }

    /// One replacement table per obfuscator, in chain order, plus the sorted
    /// omission list.
    pub fn report(&self, obfuscators: &Sequence) -> Report {
        Report::new(obfuscators.reports(), self.omissions.lock().clone())
    }
}
