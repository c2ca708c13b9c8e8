//! Gold-driven target level selection
//!
//! The richer the balance, the higher the level worth gambling for before
//! selling. Brackets come from observed sale prices per level.

/// Target enhancement level for a given gold balance.
///
/// Total over the whole domain: an unknown balance gets the baseline target,
/// and anything below the first threshold (including zero or negative
/// readings) falls into the lowest bracket.
pub fn target_level_for_gold(gold: Option<i64>) -> u32 {
    let Some(gold) = gold else { return 7 };

    if gold >= 4_000_000 {
        13
    } else if gold >= 1_600_000 {
        12
    } else if gold >= 760_000 {
        11
    } else if gold >= 340_000 {
        10
    } else if gold >= 140_000 {
        9
    } else if gold >= 20_000 {
        7
    } else {
        6
    }
}
