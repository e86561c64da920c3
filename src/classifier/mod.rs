//! Raw log line classification.
//!
//! Every line from the game server log is offered to the classifier. Lines
//! that match a known rule become synthetic events which are routed like any
//! other event. Classification never consumes the line: archival happens
//! separately.

mod error;
pub mod patterns;

pub use error::ClassifierError;

use crate::domain::EventRecord;
use patterns::PROFILER_PATTERNS;
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Prefix shared by every CSV profiler event name.
pub const PROFILER_EVENT_PREFIX: &str = "CSV_PROFILER_";

pub const PROFILER_ALREADY_STOPPED: &str = "CSV_PROFILER_ALREADY_STOPPED";

/// A single line-to-event rule.
pub trait LineRule: Send + Sync {
    /// Identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Returns the synthetic event for `line`, or `None` when the rule does not apply.
    fn classify(&self, line: &str) -> Result<Option<EventRecord>, ClassifierError>;
}

/// Capture state transitions: `Capture Started. CSV ID: 7` and friends.
pub struct ProfilerStateRule;

impl LineRule for ProfilerStateRule {
    fn name(&self) -> &str {
        "csv_profiler_state"
    }

    fn classify(&self, line: &str) -> Result<Option<EventRecord>, ClassifierError> {
        let regex = PROFILER_PATTERNS.regex(self.name())?;
        let Some(captures) = regex.captures(line) else {
            return Ok(None);
        };
        let Some(state) = captures.name("state") else {
            return Ok(None);
        };

        let mut payload = Map::new();
        for group in regex.capture_names().flatten() {
            if let Some(value) = captures.name(group) {
                payload.insert(group.to_string(), Value::String(value.as_str().trim().to_string()));
            }
        }

        let name = format!("{PROFILER_EVENT_PREFIX}{}", state.as_str().to_uppercase());
        Ok(Some(EventRecord::new(name, Value::Object(payload))))
    }
}

/// Stop requested while no capture was running.
pub struct ProfilerAlreadyStoppedRule;

impl LineRule for ProfilerAlreadyStoppedRule {
    fn name(&self) -> &str {
        "csv_profiler_already_stopped"
    }

    fn classify(&self, line: &str) -> Result<Option<EventRecord>, ClassifierError> {
        let regex = PROFILER_PATTERNS.regex(self.name())?;
        Ok(regex.find(line).map(|m| {
            let mut payload = Map::new();
            payload.insert("raw".to_string(), Value::String(m.as_str().to_string()));
            EventRecord::new(PROFILER_ALREADY_STOPPED, Value::Object(payload))
        }))
    }
}

/// Ordered rule list; the first rule that matches wins.
pub struct LogClassifier {
    rules: Vec<Box<dyn LineRule>>,
}

impl LogClassifier {
    /// Empty classifier. Every line is left unclassified.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Classifier with the CSV profiler rules installed.
    ///
    /// Fails if the built-in patterns do not compile.
    pub fn with_default_rules() -> Result<Self, ClassifierError> {
        PROFILER_PATTERNS.validate()?;

        let mut classifier = Self::empty();
        classifier.register(ProfilerAlreadyStoppedRule);
        classifier.register(ProfilerStateRule);
        Ok(classifier)
    }

    pub fn register<R: LineRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// First event produced by a rule, in registration order.
    ///
    /// A rule that fails recoverably is skipped. An unrecoverable failure ends
    /// classification of the line.
    pub fn classify(&self, line: &str) -> Option<EventRecord> {
        for rule in &self.rules {
            match rule.classify(line) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(rule = rule.name(), "Skipping classifier rule: {e}");
                }
                Err(e) => {
                    error!(rule = rule.name(), "Classifier unusable: {e}");
                    return None;
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for LogClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogClassifier")
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STARTED: &str = "[2024.03.09-18.22.31:513][412]LogCsvProfiler: Display: Capture Started. CSV ID: 7";
    const ENDED: &str = "[2024.03.09-18.23.31:513][980]LogCsvProfiler: Display: Capture Ended. Writing CSV to file : /SquadGame/Saved/Profiling/CSV/Profile(20240309_182231).csv";
    const ALREADY_STOPPED: &str = "[2024.03.09-18.24.01:001][  7]LogCsvProfiler: Warning: Capture Stop requested, but no capture was running!";

    fn classifier() -> LogClassifier {
        LogClassifier::with_default_rules().unwrap()
    }

    #[test]
    fn test_started_line_yields_event_with_id() {
        let event = classifier().classify(STARTED).unwrap();

        assert_eq!(event.name, "CSV_PROFILER_STARTED");
        assert_eq!(event.payload, json!({"state": "Started", "csv_id": "7"}));
    }

    #[test]
    fn test_ended_line_carries_file_path() {
        let event = classifier().classify(ENDED).unwrap();

        assert_eq!(event.name, "CSV_PROFILER_ENDED");
        assert_eq!(event.payload["state"], "Ended");
        assert_eq!(
            event.payload["csv_file_path"],
            "/SquadGame/Saved/Profiling/CSV/Profile(20240309_182231).csv"
        );
        assert!(event.payload.get("csv_id").is_none());
    }

    #[test]
    fn test_already_stopped_warning() {
        let event = classifier().classify(ALREADY_STOPPED).unwrap();

        assert_eq!(event.name, PROFILER_ALREADY_STOPPED);
        assert!(
            event.payload["raw"]
                .as_str()
                .unwrap()
                .contains("no capture was running")
        );
    }

    #[test]
    fn test_unrelated_lines_are_ignored() {
        let classifier = classifier();
        assert!(classifier.classify("LogSquad: Player connected").is_none());
        assert!(classifier.classify("").is_none());
        assert!(classifier.classify("LogCsvProfiler: Display: something else").is_none());
    }

    #[test]
    fn test_custom_rules_run_after_defaults() {
        struct AdminBroadcast;
        impl LineRule for AdminBroadcast {
            fn name(&self) -> &str {
                "admin_broadcast"
            }
            fn classify(&self, line: &str) -> Result<Option<EventRecord>, ClassifierError> {
                Ok(line
                    .contains("ADMIN COMMAND: Message broadcasted")
                    .then(|| EventRecord::new("ADMIN_BROADCAST", Value::Null)))
            }
        }

        let mut classifier = classifier();
        classifier.register(AdminBroadcast);

        assert_eq!(
            classifier.rule_names(),
            vec!["csv_profiler_already_stopped", "csv_profiler_state", "admin_broadcast"]
        );
        let event = classifier
            .classify("LogSquad: ADMIN COMMAND: Message broadcasted <hello> from RCON")
            .unwrap();
        assert_eq!(event.name, "ADMIN_BROADCAST");
    }

    struct FailingRule(fn() -> ClassifierError);

    impl LineRule for FailingRule {
        fn name(&self) -> &str {
            "failing"
        }
        fn classify(&self, _line: &str) -> Result<Option<EventRecord>, ClassifierError> {
            Err((self.0)())
        }
    }

    struct MatchAll;

    impl LineRule for MatchAll {
        fn name(&self) -> &str {
            "match_all"
        }
        fn classify(&self, _line: &str) -> Result<Option<EventRecord>, ClassifierError> {
            Ok(Some(EventRecord::new("ANY", Value::Null)))
        }
    }

    #[test]
    fn test_missing_pattern_skips_only_that_rule() {
        let mut classifier = LogClassifier::empty();
        classifier.register(FailingRule(|| ClassifierError::PatternNotFound {
            name: "gone".to_string(),
        }));
        classifier.register(MatchAll);

        assert_eq!(classifier.classify("any line").unwrap().name, "ANY");
    }

    #[test]
    fn test_broken_pattern_stops_classification() {
        let mut classifier = LogClassifier::empty();
        classifier.register(FailingRule(|| ClassifierError::CompilationFailed {
            pattern: "[".to_string(),
            name: "broken".to_string(),
            source: regex::Regex::new("[").unwrap_err(),
        }));
        classifier.register(MatchAll);

        assert!(classifier.classify("any line").is_none());
    }

    #[test]
    fn test_empty_classifier_matches_nothing() {
        assert!(LogClassifier::empty().classify(STARTED).is_none());
    }
}
