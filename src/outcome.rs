//! Enhancement outcome classification
//!
//! Maps the bot's free-form reply text to a tagged [`Outcome`], and provides
//! the companion extractors for gold balances and the current item level.
//! Everything here is stateless and never panics on malformed input.

use once_cell::sync::Lazy;
use regex::Regex;

/// Result of a single enhancement attempt, as reported by the game bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The item advanced; payload is the new level reported by the bot.
    Success(u32),
    /// Level held, gold spent.
    Maintain,
    /// The item broke; a fresh +0 replacement follows in the same message.
    Destroy,
    /// Not enough gold to attempt the enhancement.
    InsufficientGold,
    /// No known marker matched.
    Unrecognized,
}

// Marker patterns spoken by the game bot. Precedence is fixed: a success
// pair beats everything, then the legendary single-level form, then
// maintain, destroy, and the out-of-gold notice.
static SUCCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"〖✨강화 성공✨ \+(\d+) → \+(\d+)〗").unwrap());
static LEGEND_SUCCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"전설의 『\[\+(\d+)\] .+』 강화에 성공").unwrap());
static MAINTAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"〖💦강화 유지💦〗").unwrap());
static DESTROY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"〖💥강화 파괴💥〗").unwrap());

const NO_GOLD_MARKER: &str = "골드가 부족해";

// Two distinct balance labels, same numeric grammar: thousands-separated
// digits followed by the G suffix.
static GOLD_AFTER_ENHANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"남은 골드: ([\d,]+)G").unwrap());
static GOLD_AFTER_SALE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"현재 보유 골드: ([\d,]+)G").unwrap());

static LEVEL_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\+(\d+)\]").unwrap());

/// Classify a raw bot reply. First marker in precedence order wins,
/// independent of where it sits in the text.
pub fn classify(text: &str) -> Outcome {
    if let Some(level) = captured_u32(&SUCCESS_RE, text, 2) {
        return Outcome::Success(level);
    }
    // Legendary enhancements report a single bracketed level instead of a
    // before/after pair (the bot switches format from +10 upward).
    if let Some(level) = captured_u32(&LEGEND_SUCCESS_RE, text, 1) {
        return Outcome::Success(level);
    }
    if MAINTAIN_RE.is_match(text) {
        return Outcome::Maintain;
    }
    if DESTROY_RE.is_match(text) {
        return Outcome::Destroy;
    }
    if text.contains(NO_GOLD_MARKER) {
        return Outcome::InsufficientGold;
    }
    Outcome::Unrecognized
}

/// Gold balance from an enhancement reply (`남은 골드: N,NNNG`).
pub fn gold_after_enhance(text: &str) -> Option<i64> {
    parse_gold(&GOLD_AFTER_ENHANCE_RE, text)
}

/// Gold balance from a sale reply (`현재 보유 골드: N,NNNG`).
pub fn gold_after_sale(text: &str) -> Option<i64> {
    parse_gold(&GOLD_AFTER_SALE_RE, text)
}

/// Current item level: the last `[+N]` tag in the text. The buffer may echo
/// history, so the rightmost occurrence is the freshest state.
pub fn current_item_level(text: &str) -> Option<u32> {
    LEVEL_TAG_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn captured_u32(re: &Regex, text: &str, group: usize) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_gold(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}
