//! Locator catalogs for the notebook UI.
//!
//! The UI ships no stable automation hooks, so every logical target is an
//! ordered list of alternatives; the first one that resolves wins. Keeping
//! the catalogs here, as data, leaves the resolution machinery generic.

use relay_cdp_adapter::Locator;

/// Default target address when a query does not name a notebook.
pub const DEFAULT_TARGET_URL: &str = "https://notebooklm.google.com/";

/// Domain the conversational UI lives on.
pub const TARGET_DOMAIN: &str = "notebooklm.google.com";

/// Path segment identifying a notebook-scoped address.
pub const NOTEBOOK_PATH_SEGMENT: &str = "notebook/";

pub fn chat_input() -> Vec<Locator> {
    vec![
        Locator::css(r#"[data-testid="chat-input"]"#),
        Locator::css(r#"textarea[placeholder*="Start typing"]"#),
        Locator::css(r#"input[placeholder*="Start typing"]"#),
        Locator::css(r#"textarea[placeholder*="Ask"]"#),
        Locator::css(".chat-input textarea"),
        Locator::css(r#"textarea[aria-label*="Ask"]"#),
    ]
}

pub fn submit_button() -> Vec<Locator> {
    vec![
        Locator::css(r#"button[data-testid="send-button"]"#),
        Locator::css(r#"button[aria-label*="Send"]"#),
        Locator::css(r#"button[aria-label="Submit"]"#),
        Locator::css(r#"button[type="submit"]"#),
    ]
}

pub fn response_content() -> Locator {
    Locator::css(".message-content")
}

/// Follow-up suggestion affordances; these only appear once the UI has
/// finished generating.
pub fn suggestion_chips() -> Vec<Locator> {
    vec![
        Locator::css(".suggestion-chip"),
        Locator::css("button.follow-up"),
        Locator::css(r#"[class*="suggestion"]"#),
        Locator::css(".follow-up-question"),
    ]
}

/// Whether an address is a sign-in interstitial rather than the target UI.
pub fn is_signin_address(address: &str) -> bool {
    address.contains("accounts.google.com") || address.to_lowercase().contains("signin")
}

/// Whether an address is on the conversational UI's domain.
pub fn is_target_domain(address: &str) -> bool {
    address.contains(TARGET_DOMAIN)
}

/// Notebook identifier carried by a notebook-scoped address, if any.
pub fn notebook_id(address: &str) -> Option<&str> {
    let (_, tail) = address.split_once(NOTEBOOK_PATH_SEGMENT)?;
    let id = tail.split(['/', '?', '#']).next().unwrap_or("");
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signin_addresses_are_recognized() {
        assert!(is_signin_address(
            "https://accounts.google.com/v3/signin/identifier?x=y"
        ));
        assert!(is_signin_address("https://example.com/SignIn"));
        assert!(!is_signin_address("https://notebooklm.google.com/notebook/a"));
    }

    #[test]
    fn notebook_id_extraction() {
        assert_eq!(
            notebook_id("https://notebooklm.google.com/notebook/abc123"),
            Some("abc123")
        );
        assert_eq!(
            notebook_id("https://notebooklm.google.com/notebook/abc123/"),
            Some("abc123")
        );
        assert_eq!(notebook_id("https://notebooklm.google.com/"), None);
    }

    #[test]
    fn catalogs_prioritize_the_dedicated_test_hook() {
        assert_eq!(
            chat_input()[0],
            Locator::css(r#"[data-testid="chat-input"]"#)
        );
    }
}
