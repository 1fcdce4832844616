//! Dual-signal detection of the end of a generation episode.
//!
//! The target UI never says "done". Two independent signals substitute:
//! new follow-up suggestion affordances appearing (the UI only shows them
//! once generation finished), and sustained silence after material content
//! began. The structural signal wins when both would fire in the same tick,
//! since it reflects the remote system's own completion marker rather than
//! an inferred timeout.

use std::time::Duration;

/// Silence required after material content before the stream is considered
/// finished.
pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(6);

/// Why the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// More unique suggestion affordances than before the query.
    SuggestionIncrease { before: usize, after: usize },
    /// No absorbed fragment for at least the silence window.
    SilenceTimeout(Duration),
}

/// Evaluates both completion conditions against a pre-submission baseline.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    baseline_suggestions: usize,
    silence_timeout: Duration,
}

impl CompletionDetector {
    pub fn new(baseline_suggestions: usize) -> Self {
        Self {
            baseline_suggestions,
            silence_timeout: SILENCE_TIMEOUT,
        }
    }

    pub fn with_silence_timeout(mut self, silence_timeout: Duration) -> Self {
        self.silence_timeout = silence_timeout;
        self
    }

    pub fn baseline(&self) -> usize {
        self.baseline_suggestions
    }

    /// One tick's verdict. `idle` is the time since the last absorbed
    /// fragment; the silence condition is only armed once material content
    /// has been released.
    pub fn evaluate(
        &self,
        current_suggestions: usize,
        material_started: bool,
        idle: Duration,
    ) -> Option<CompletionSignal> {
        if current_suggestions > self.baseline_suggestions {
            return Some(CompletionSignal::SuggestionIncrease {
                before: self.baseline_suggestions,
                after: current_suggestions,
            });
        }
        if material_started && idle > self.silence_timeout {
            return Some(CompletionSignal::SilenceTimeout(idle));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_signal_while_content_flows() {
        let detector = CompletionDetector::new(2);
        assert_eq!(detector.evaluate(2, true, Duration::from_secs(1)), None);
    }

    #[test]
    fn silence_never_fires_before_material_content() {
        let detector = CompletionDetector::new(0);
        // Arbitrarily long idle time: still no completion.
        assert_eq!(detector.evaluate(0, false, Duration::from_secs(600)), None);
    }

    #[test]
    fn silence_fires_after_material_content() {
        let detector = CompletionDetector::new(0);
        let idle = Duration::from_secs(7);
        assert_eq!(
            detector.evaluate(0, true, idle),
            Some(CompletionSignal::SilenceTimeout(idle))
        );
    }

    #[test]
    fn silence_requires_strictly_more_than_the_window() {
        let detector = CompletionDetector::new(0);
        assert_eq!(detector.evaluate(0, true, SILENCE_TIMEOUT), None);
    }

    #[test]
    fn suggestion_increase_completes_immediately() {
        let detector = CompletionDetector::new(2);
        assert_eq!(
            detector.evaluate(3, false, Duration::ZERO),
            Some(CompletionSignal::SuggestionIncrease {
                before: 2,
                after: 3
            })
        );
    }

    #[test]
    fn structural_signal_takes_precedence_over_silence() {
        let detector = CompletionDetector::new(2);
        // Both conditions hold; the structural one must win.
        let signal = detector.evaluate(3, true, Duration::from_secs(30));
        assert_eq!(
            signal,
            Some(CompletionSignal::SuggestionIncrease {
                before: 2,
                after: 3
            })
        );
    }

    #[test]
    fn fewer_suggestions_than_baseline_is_not_completion() {
        let detector = CompletionDetector::new(4);
        assert_eq!(detector.evaluate(3, false, Duration::ZERO), None);
    }
}
