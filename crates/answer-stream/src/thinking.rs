//! Classification and removal of transient "thinking" placeholders.
//!
//! The target UI renders short progress phrases into the response container
//! while it composes an answer. These are not part of the content and must
//! be stripped before any delta reaches the consumer. The catalog is plain
//! data so the whole module stays a pure function over test vectors.

/// Known placeholder phrases, normalized without trailing punctuation.
const PLACEHOLDER_PHRASES: &[&str] = &[
    "Thinking",
    "Reading documents",
    "Reading full chapters",
    "Gathering facts",
    "Gathering info",
    "Parsing the data",
    "Sifting through pages",
    "Working on it",
    "Analyzing",
    "Checking sources",
    "Checking the scope",
    "Checking your uploads",
    "Just a sec",
    "Assessing relevance",
    "Searching your docs",
    "Refining the answer",
    "Scanning the text",
    "Scanning your sources",
    "Finding relevant info",
    "Finding key words",
    "Finding connections",
    "Opening your notes",
    "Reviewing the content",
    "Exploring your material",
    "Examining the specifics",
    "Getting the gist",
];

/// Progress verbs that open placeholder variants not in the catalog.
const PROGRESS_VERBS: &[&str] = &[
    "Finding",
    "Checking",
    "Scanning",
    "Reading",
    "Getting",
    "Thinking",
    "Working",
    "Parsing",
    "Sifting",
    "Analyzing",
    "Assessing",
    "Refining",
    "Reviewing",
    "Exploring",
    "Examining",
    "Gathering",
    "Consulting",
];

/// Texts at or beyond this length are real content even when they open with
/// a progress verb.
const HEURISTIC_MAX_CHARS: usize = 60;

/// Remove leading thinking placeholders from `raw`.
///
/// Greedy longest match, applied to a fixpoint: every catalog phrase is
/// tried as a case-insensitive prefix, the match extended across
/// immediately trailing dots, ellipsis and whitespace, and the longest
/// consumed prefix removed; the UI stacks phrases ("Thinking... Gathering
/// facts"), so stripping repeats until nothing matches. A short residue
/// opening with a progress verb is consumed entirely. Anything else passes
/// through unchanged.
pub fn strip(raw: &str) -> String {
    let mut text = raw.trim_start();
    loop {
        let mut consumed = 0usize;
        for phrase in PLACEHOLDER_PHRASES {
            if let Some(len) = prefix_match_len(text, phrase) {
                consumed = consumed.max(len);
            }
        }
        if consumed == 0 {
            break;
        }
        text = &text[consumed..];
    }
    if text.is_empty() {
        return String::new();
    }

    if text.chars().count() < HEURISTIC_MAX_CHARS
        && PROGRESS_VERBS
            .iter()
            .any(|verb| starts_with_ignore_case(text, verb))
    {
        return String::new();
    }

    text.to_string()
}

/// Whether `raw` is nothing but a placeholder.
pub fn is_placeholder(raw: &str) -> bool {
    !raw.trim().is_empty() && strip(raw).is_empty()
}

/// Byte length of `phrase` matched case-insensitively at the start of
/// `text`, extended across trailing dots/ellipsis/whitespace. `None` when
/// `text` does not start with the phrase.
fn prefix_match_len(text: &str, phrase: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    let mut end = 0usize;
    for expected in phrase.chars() {
        let (idx, actual) = chars.next()?;
        if !actual.eq_ignore_ascii_case(&expected) {
            return None;
        }
        end = idx + actual.len_utf8();
    }
    while let Some(&(idx, ch)) = chars.peek() {
        if ch == '.' || ch == '…' || ch.is_whitespace() {
            end = idx + ch.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    Some(end)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut chars = text.chars();
    prefix.chars().all(|expected| {
        chars
            .next()
            .is_some_and(|actual| actual.eq_ignore_ascii_case(&expected))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_placeholder_strips_to_empty() {
        for raw in [
            "Thinking",
            "Thinking...",
            "thinking…",
            "THINKING",
            "Checking your uploads...",
            "Getting the gist",
        ] {
            assert_eq!(strip(raw), "", "expected {raw:?} to strip to empty");
        }
    }

    #[test]
    fn placeholder_prefix_is_removed_and_remainder_preserved() {
        assert_eq!(
            strip("Thinking... The capital of France is Paris."),
            "The capital of France is Paris."
        );
        assert_eq!(
            strip("Gathering facts. Here is what the sources say"),
            "Here is what the sources say"
        );
    }

    #[test]
    fn longest_catalog_match_wins() {
        // "Reading" (verb) and "Reading full chapters" (phrase) both match;
        // the longer phrase must be the one consumed.
        assert_eq!(strip("Reading full chapters now"), "now");
    }

    #[test]
    fn short_text_with_progress_verb_is_consumed() {
        assert_eq!(strip("Consulting the archives..."), "");
        assert_eq!(strip("Finding the best passages"), "");
    }

    #[test]
    fn long_text_with_progress_verb_is_content() {
        let essay = "Reading comprehension improves when the source material \
                     is reviewed twice before summarizing it in your own words.";
        assert_eq!(strip(essay), essay);
    }

    #[test]
    fn ordinary_content_passes_through() {
        let text = "The capital of France is Paris.";
        assert_eq!(strip(text), text);
    }

    #[test]
    fn leading_whitespace_does_not_hide_a_placeholder() {
        assert_eq!(strip("  Thinking..."), "");
    }

    #[test]
    fn empty_and_blank_input_yield_empty() {
        assert_eq!(strip(""), "");
        assert_eq!(strip("   "), "");
    }

    #[test]
    fn clean_text_is_never_longer_than_raw() {
        for raw in [
            "Thinking... some answer",
            "unrelated",
            "Scanning your sources",
            "",
        ] {
            assert!(strip(raw).len() <= raw.len());
        }
    }

    #[test]
    fn is_placeholder_matches_strip_semantics() {
        assert!(is_placeholder("Thinking..."));
        assert!(is_placeholder("Finding key words…"));
        assert!(!is_placeholder("The answer is short."));
        assert!(!is_placeholder("   "));
    }

    #[test]
    fn transition_sequence_produces_expected_clean_texts() {
        let raws = [
            "Thinking...",
            "Thinking... Gathering facts",
            "The capital of France is Paris.",
        ];
        let cleans: Vec<String> = raws.iter().map(|raw| strip(raw)).collect();
        assert_eq!(cleans, ["", "", "The capital of France is Paris."]);
    }
}
