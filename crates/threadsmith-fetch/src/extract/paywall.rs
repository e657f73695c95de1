//! Login-wall and paywall detection

use super::text::char_len;

/// Pages with at least this much text are never classified as walled
pub const PAYWALL_TEXT_THRESHOLD: usize = 500;

/// Keywords that must appear at least twice (distinct) on a short page
pub const PAYWALL_KEYWORDS: &[&str] = &[
    "sign in",
    "subscribe",
    "members only",
    "log in",
    "create an account",
    "subscription",
    "premium content",
    "paywall",
    "already a subscriber",
    "register to continue",
];

/// Distinct paywall keywords found in `text`
pub fn keyword_hits(text: &str) -> usize {
    let lower = text.to_lowercase();
    PAYWALL_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count()
}

/// Short text dominated by login or subscription prompts
pub fn looks_paywalled(text: &str) -> bool {
    char_len(text) < PAYWALL_TEXT_THRESHOLD && keyword_hits(text) >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_wall_detected() {
        assert!(looks_paywalled(
            "This story is for members only. Subscribe now or Sign in to keep reading."
        ));
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        assert!(!looks_paywalled("Please subscribe to our newsletter."));
    }

    #[test]
    fn test_long_text_never_walled() {
        let long = format!("Sign in to subscribe. {}", "Real article text. ".repeat(40));
        assert!(!looks_paywalled(&long));
    }
}
