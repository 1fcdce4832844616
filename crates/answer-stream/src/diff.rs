//! Incremental text deltas between successive reads of the response
//! container.

/// Relationship of the current text to the previously observed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextDelta {
    /// Current text extends the previous text by `fragment`.
    Growth(String),
    /// Current text does not extend the previous text: the container was
    /// rewritten (placeholder swapped for the answer, or the answer itself
    /// revised). The caller must drop its tracked text before the next
    /// comparison.
    Discontinuity,
    NoChange,
}

/// Classify the transition from `previous` to `current`.
pub fn delta(previous: &str, current: &str) -> TextDelta {
    if current == previous {
        return TextDelta::NoChange;
    }
    match current.strip_prefix(previous) {
        Some(fragment) => TextDelta::Growth(fragment.to_string()),
        None => TextDelta::Discontinuity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_yields_the_suffix() {
        let previous = "The capital";
        let current = "The capital of France";
        match delta(previous, current) {
            TextDelta::Growth(fragment) => {
                assert_eq!(fragment, " of France");
                // Round-trip invariant.
                assert_eq!(format!("{previous}{fragment}"), current);
            }
            other => panic!("expected growth, got {other:?}"),
        }
    }

    #[test]
    fn growth_from_empty_previous_is_the_whole_text() {
        assert_eq!(
            delta("", "hello"),
            TextDelta::Growth("hello".to_string())
        );
    }

    #[test]
    fn identical_text_is_no_change() {
        assert_eq!(delta("same", "same"), TextDelta::NoChange);
        assert_eq!(delta("", ""), TextDelta::NoChange);
    }

    #[test]
    fn replacement_is_a_discontinuity() {
        assert_eq!(
            delta("Thinking...", "The answer is 42"),
            TextDelta::Discontinuity
        );
    }

    #[test]
    fn shrinkage_is_a_discontinuity() {
        assert_eq!(delta("a longer text", "a longer"), TextDelta::Discontinuity);
        assert_eq!(delta("something", ""), TextDelta::Discontinuity);
    }

    #[test]
    fn same_length_rewrite_is_a_discontinuity() {
        assert_eq!(delta("abcd", "abce"), TextDelta::Discontinuity);
    }
}
