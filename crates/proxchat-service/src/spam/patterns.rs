//! Heuristic content analysis.
//!
//! Advisory signals only: the gate in [`detector`](super::detector)
//! decides admission, these heuristics feed logging and a combined
//! 0–100 score.

/// Phrases common in promotional and scam content.
const SCAM_PHRASES: &[&str] = &[
    "click here",
    "buy now",
    "limited time",
    "act now",
    "guarantee",
    "risk free",
    "no obligation",
    "free money",
    "you won",
    "winner",
    "prize",
];

/// A run of more than this many identical characters is suspicious.
const MAX_REPEATED_CHARS: usize = 5;

/// Whether the text contains a run of identical characters longer than
/// `max`.
pub fn has_repeated_chars(text: &str, max: usize) -> bool {
    let mut count = 0;
    let mut last: Option<char> = None;
    for c in text.chars() {
        if Some(c) == last {
            count += 1;
            if count > max {
                return true;
            }
        } else {
            count = 1;
            last = Some(c);
        }
    }
    false
}

/// Whether more than 70% of the letters are uppercase. Texts under 10
/// letters are too short to judge.
pub fn has_excessive_caps(text: &str) -> bool {
    let mut letters = 0usize;
    let mut caps = 0usize;
    for c in text.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if c.is_uppercase() {
                caps += 1;
            }
        }
    }
    if letters < 10 {
        return false;
    }
    caps * 10 > letters * 7
}

/// Whether the text contains a scam/promo phrase.
pub fn has_scam_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCAM_PHRASES.iter().any(|p| lower.contains(p))
}

/// Whether a token looks like contact information: an email-shaped
/// token or a long run of phone digits.
pub fn has_contact_info(text: &str) -> bool {
    for token in text.split_whitespace() {
        if let Some(at) = token.find('@') {
            if at > 0 && token[at + 1..].contains('.') {
                return true;
            }
        }

        let digits = token
            .chars()
            .filter(|c| c.is_ascii_digit())
            .count();
        let separators = token
            .chars()
            .filter(|c| matches!(c, '-' | '.' | '(' | ')' | '+'))
            .count();
        if digits >= 10 && digits + separators == token.chars().count() {
            return true;
        }
    }
    false
}

/// Combined heuristic spam score, 0–100.
pub fn spam_score(text: &str) -> u8 {
    let mut score = 0u32;

    if has_repeated_chars(text, MAX_REPEATED_CHARS) {
        score += 20;
    }
    if has_excessive_caps(text) {
        score += 15;
    }
    if has_scam_phrase(text) {
        score += 20;
    }
    if has_contact_info(text) {
        score += 25;
    }
    if text.contains("http://") || text.contains("https://") {
        score += 20;
    }

    score.min(100) as u8
}
