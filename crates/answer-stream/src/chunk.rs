//! Word-count-gated accumulation of clean-text fragments.
//!
//! Raw DOM polling produces noisy micro-updates; fragments are buffered and
//! released only once enough words have accumulated, so consumers see a
//! readable stream instead of two-character deltas.

use tokio::time::Instant;

use crate::diff::{self, TextDelta};

/// Minimum words in a released chunk. The final flush is exempt.
pub const CHUNK_WORD_THRESHOLD: usize = 10;

/// Tracking state threaded through the poll loop.
#[derive(Debug, Clone)]
pub struct ChunkState {
    /// Clean text observed so far in the current generation episode.
    tracked: String,
    /// Fragments absorbed but not yet released.
    buffer: String,
    last_change: Instant,
    material_started: bool,
}

impl ChunkState {
    pub fn new(now: Instant) -> Self {
        Self {
            tracked: String::new(),
            buffer: String::new(),
            last_change: now,
            material_started: false,
        }
    }

    /// True once the first chunk has been released.
    pub fn material_started(&self) -> bool {
        self.material_started
    }

    /// Time since the last absorbed fragment.
    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_change)
    }
}

/// Absorb the current clean text, releasing a chunk when the buffered word
/// count reaches the threshold.
///
/// A discontinuity (the container was rewritten rather than extended)
/// clears both the tracked text and the buffer, then absorbs the entire new
/// text as fresh content in the same call.
pub fn absorb(state: &mut ChunkState, clean: &str, now: Instant) -> Option<String> {
    let fragment = match diff::delta(&state.tracked, clean) {
        TextDelta::NoChange => return None,
        TextDelta::Growth(fragment) => fragment,
        TextDelta::Discontinuity => {
            state.tracked.clear();
            state.buffer.clear();
            if clean.is_empty() {
                return None;
            }
            clean.to_string()
        }
    };

    state.buffer.push_str(&fragment);
    state.tracked = clean.to_string();
    state.last_change = now;

    if word_count(&state.buffer) >= CHUNK_WORD_THRESHOLD {
        state.material_started = true;
        Some(std::mem::take(&mut state.buffer))
    } else {
        None
    }
}

/// Flush whatever is buffered, regardless of word count. Called once when
/// the stream ends.
pub fn finalize(state: &mut ChunkState) -> Option<String> {
    if state.buffer.is_empty() {
        return None;
    }
    state.material_started = true;
    Some(std::mem::take(&mut state.buffer))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ChunkState {
        ChunkState::new(Instant::now())
    }

    #[test]
    fn short_fragments_are_held_back() {
        let mut state = state();
        let now = Instant::now();
        assert_eq!(absorb(&mut state, "a few words", now), None);
        assert!(!state.material_started());
    }

    #[test]
    fn threshold_releases_the_whole_buffer_once() {
        let mut state = state();
        let now = Instant::now();
        assert_eq!(absorb(&mut state, "one two three four five", now), None);
        let released = absorb(
            &mut state,
            "one two three four five six seven eight nine ten",
            now,
        );
        assert_eq!(
            released.as_deref(),
            Some("one two three four five six seven eight nine ten")
        );
        assert!(state.material_started());
        // The buffer was taken; nothing further to flush.
        assert_eq!(finalize(&mut state), None);
    }

    #[test]
    fn released_chunks_meet_the_word_threshold() {
        let mut state = state();
        let now = Instant::now();
        let mut text = String::new();
        for i in 0..25 {
            text.push_str(&format!("word{i} "));
            if let Some(chunk) = absorb(&mut state, &text, now) {
                assert!(
                    chunk.split_whitespace().count() >= CHUNK_WORD_THRESHOLD,
                    "undersized chunk released: {chunk:?}"
                );
            }
        }
    }

    #[test]
    fn discontinuity_clears_buffer_and_absorbs_the_new_text() {
        let mut state = state();
        let now = Instant::now();
        assert_eq!(absorb(&mut state, "draft that will vanish", now), None);
        // Rewrite: the new text does not extend the old.
        assert_eq!(absorb(&mut state, "fresh start", now), None);
        assert_eq!(finalize(&mut state).as_deref(), Some("fresh start"));
    }

    #[test]
    fn discontinuity_to_empty_clears_everything() {
        let mut state = state();
        let now = Instant::now();
        assert_eq!(absorb(&mut state, "about to disappear", now), None);
        assert_eq!(absorb(&mut state, "", now), None);
        assert_eq!(finalize(&mut state), None);
    }

    #[test]
    fn finalize_flushes_under_threshold_content() {
        let mut state = state();
        let now = Instant::now();
        assert_eq!(
            absorb(&mut state, "The capital of France is Paris.", now),
            None
        );
        assert_eq!(
            finalize(&mut state).as_deref(),
            Some("The capital of France is Paris.")
        );
        assert!(state.material_started());
    }

    #[test]
    fn idle_time_resets_on_every_absorbed_fragment() {
        let mut state = state();
        let start = Instant::now();
        absorb(&mut state, "first", start);
        let later = start + std::time::Duration::from_secs(5);
        absorb(&mut state, "first and more", later);
        assert_eq!(
            state.idle_for(later + std::time::Duration::from_secs(2)),
            std::time::Duration::from_secs(2)
        );
    }

    #[test]
    fn no_change_does_not_reset_idle_time() {
        let mut state = state();
        let start = Instant::now();
        absorb(&mut state, "stable text", start);
        let later = start + std::time::Duration::from_secs(4);
        absorb(&mut state, "stable text", later);
        assert_eq!(state.idle_for(later), std::time::Duration::from_secs(4));
    }
}
