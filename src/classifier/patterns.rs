// Named line patterns, compiled once on first use
use super::error::ClassifierError;
use regex::Regex;
use std::sync::OnceLock;

/// Rule name to regex table, compiled lazily and shared for the process lifetime.
pub struct PatternTable {
    entries: &'static [(&'static str, &'static str)], // (name, pattern)
    compiled: OnceLock<Result<Vec<(&'static str, Regex)>, ClassifierError>>,
}

impl PatternTable {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            entries,
            compiled: OnceLock::new(),
        }
    }

    fn compiled(&self) -> Result<&[(&'static str, Regex)], ClassifierError> {
        self.compiled
            .get_or_init(|| {
                self.entries
                    .iter()
                    .map(|&(name, pattern)| {
                        Regex::new(pattern)
                            .map(|regex| (name, regex))
                            .map_err(|source| ClassifierError::CompilationFailed {
                                pattern: pattern.to_string(),
                                name: name.to_string(),
                                source,
                            })
                    })
                    .collect()
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(|e| e.clone())
    }

    /// Compile every entry so a broken pattern surfaces at startup.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        self.compiled().map(|_| ())
    }

    pub fn regex(&self, name: &str) -> Result<&Regex, ClassifierError> {
        self.compiled()?
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, regex)| regex)
            .ok_or_else(|| ClassifierError::PatternNotFound {
                name: name.to_string(),
            })
    }
}

/// Unreal CSV profiler lines as printed by the game server.
pub static PROFILER_PATTERNS: PatternTable = PatternTable::new(&[
    (
        "csv_profiler_state",
        r"LogCsvProfiler: Display: Capture (?P<state>\w+)(?:\.?\s*CSV ID:\s*(?P<csv_id>[\w-]+))?(?:.*?Writing CSV to file\s*:\s*(?P<csv_file_path>.+))?",
    ),
    (
        "csv_profiler_already_stopped",
        r"LogCsvProfiler: Warning: Capture Stop requested, but no capture was running!",
    ),
]);
