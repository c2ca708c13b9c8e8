//! Item category rules
//!
//! Decides whether a drop is a disposable weapon (sell it, keep cycling) or
//! something worth keeping. Classification is by name suffix; the beam sword
//! exclusion must run before the generic keyword set because `광선검` itself
//! ends in `검`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

/// Whether the held item belongs to the disposable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    /// Generic weapon drop; sold as soon as the policy says so.
    Sellable,
    /// Kept and enhanced instead of sold.
    Special,
}

impl ItemCategory {
    pub fn is_sellable(self) -> bool {
        matches!(self, ItemCategory::Sellable)
    }

    pub fn from_sellable(sellable: bool) -> Self {
        if sellable {
            ItemCategory::Sellable
        } else {
            ItemCategory::Special
        }
    }
}

/// Name suffixes that mark a disposable weapon drop.
pub const SELL_KEYWORDS: [&str; 4] = ["검", "몽둥이", "망치", "도끼"];

/// Never sold, even though the name also ends in `검`. Checked first.
const KEEP_KEYWORD: &str = "광선검";

static NEW_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"⚔️새로운 검 획득: \[\+\d+\] .+").unwrap());
static BRACKET_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"『\[\+\d+\] ([^』]+)』").unwrap());

/// Classify an item by its (trimmed) name suffix.
pub fn classify_by_name(name: &str) -> ItemCategory {
    let name = name.trim();
    if name.ends_with(KEEP_KEYWORD) {
        return ItemCategory::Special;
    }
    if SELL_KEYWORDS.iter().any(|kw| name.ends_with(kw)) {
        ItemCategory::Sellable
    } else {
        ItemCategory::Special
    }
}

/// Sell decision from a new-item announcement.
///
/// When the announcement pattern is absent the answer is `true`: the loop
/// fails open toward selling and keeps cycling.
pub fn is_sellable_announcement(text: &str) -> bool {
    match NEW_ITEM_RE.find(text) {
        Some(segment) => classify_by_name(segment.as_str()).is_sellable(),
        None => true,
    }
}

/// Sell decision for the replacement item that arrives with a destroy
/// message. The destroy text names the broken item first, so the second
/// bracketed occurrence is the new drop; with a single occurrence that one
/// is used, and with none the default is `true` (fail open, keep selling).
pub fn is_sellable_after_destroy(text: &str, emit_log: bool) -> bool {
    let names: Vec<&str> = BRACKET_ITEM_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let name = match names.len() {
        0 => return true,
        1 => names[0].trim(),
        _ => names[1].trim(),
    };

    if name.ends_with(KEEP_KEYWORD) {
        if emit_log {
            info!("    🌟 beam sword acquired, keeping it: {name}");
        }
        return false;
    }
    if SELL_KEYWORDS.iter().any(|kw| name.ends_with(kw)) {
        if emit_log {
            info!("    🗡️ sellable weapon: {name}");
        }
        return true;
    }
    if emit_log {
        info!("    ✨ special item acquired, keeping it: {name}");
    }
    false
}

/// Category of the item currently in hand, read from the freshest (last)
/// bracketed occurrence in the buffer. Defaults to `Sellable` when no item
/// is visible at all.
pub fn current_item_category(text: &str) -> ItemCategory {
    BRACKET_ITEM_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| classify_by_name(m.as_str()))
        .unwrap_or(ItemCategory::Sellable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_weapons_are_sellable() {
        assert_eq!(classify_by_name("낡은 검"), ItemCategory::Sellable);
        assert_eq!(classify_by_name("녹슨 망치"), ItemCategory::Sellable);
        assert_eq!(classify_by_name("전쟁 도끼"), ItemCategory::Sellable);
        assert_eq!(
            classify_by_name("그림자 갈망하는 몽둥이"),
            ItemCategory::Sellable
        );
    }

    #[test]
    fn beam_sword_is_special_despite_sword_suffix() {
        // 광선검 ends in 검; the exclusion must win.
        assert_eq!(classify_by_name("전설의 광선검"), ItemCategory::Special);
    }

    #[test]
    fn unknown_suffix_is_special() {
        assert_eq!(
            classify_by_name("내일 시들 것 같은 할인 꽃다발"),
            ItemCategory::Special
        );
    }

    #[test]
    fn announcement_with_generic_weapon_sells() {
        assert!(is_sellable_announcement("⚔️새로운 검 획득: [+0] 낡은 검"));
        assert!(is_sellable_announcement("⚔️새로운 검 획득: [+0] 낡은 몽둥이"));
    }

    #[test]
    fn announcement_with_beam_sword_keeps() {
        assert!(!is_sellable_announcement("⚔️새로운 검 획득: [+0] 광선검"));
    }

    #[test]
    fn missing_announcement_fails_open_to_selling() {
        assert!(is_sellable_announcement("〖💦강화 유지💦〗"));
    }

    #[test]
    fn destroy_uses_second_occurrence() {
        // First bracket is the broken item, second the replacement.
        let text = "〖💥강화 파괴💥〗 『[+9] 낡은 검』 → 『[+0] 광선검』";
        assert!(!is_sellable_after_destroy(text, false));

        let text = "〖💥강화 파괴💥〗 『[+9] 광선검』 → 『[+0] 낡은 검』";
        assert!(is_sellable_after_destroy(text, false));
    }

    #[test]
    fn destroy_single_occurrence_uses_it() {
        assert!(is_sellable_after_destroy("『[+0] 낡은 검』", false));
        assert!(!is_sellable_after_destroy("『[+0] 할인 꽃다발』", false));
    }

    #[test]
    fn destroy_without_brackets_fails_open() {
        assert!(is_sellable_after_destroy("〖💥강화 파괴💥〗", false));
    }

    #[test]
    fn current_category_reads_last_occurrence() {
        let text = "『[+2] 광선검』 … 『[+5] 낡은 검』";
        assert_eq!(current_item_category(text), ItemCategory::Sellable);

        let text = "『[+2] 낡은 검』 … 『[+5] 광선검』";
        assert_eq!(current_item_category(text), ItemCategory::Special);
    }

    #[test]
    fn current_category_defaults_to_sellable() {
        assert_eq!(current_item_category("빈 화면"), ItemCategory::Sellable);
    }
}
