//! Level thresholds and level-up settlement

use super::event::{Notification, NotificationKind};
use super::rules::Rules;

/// XP needed to advance from `level` to `level + 1`
///
/// Grows geometrically: `xp_base * xp_growth^(level - 1)`, rounded up so that an
/// integer XP total compares exactly as it would against the fractional threshold.
pub fn xp_threshold(level: u32, rules: &Rules) -> u64 {
    let exponent = level.saturating_sub(1).min(i32::MAX as u32) as i32;
    let threshold = rules.xp_base as f64 * rules.xp_growth.powi(exponent);

    if threshold.is_finite() { (threshold.ceil() as u64).max(1) } else { u64::MAX }
}

/// Consume XP into levels until it drops below the current threshold
///
/// The remainder carries into the next level, so a large award can cascade
/// through several level-ups. Returns how many levels were gained.
pub fn settle_levels(
    level: &mut u32,
    xp: &mut u64,
    rules: &Rules,
    out: &mut Vec<Notification>,
) -> u32 {
    let mut gained = 0;

    loop {
        let threshold = xp_threshold(*level, rules);
        if *xp < threshold {
            break;
        }
        *xp -= threshold;
        *level = level.saturating_add(1);
        gained += 1;
        out.push(Notification::new(
            NotificationKind::LevelUp,
            format!("Level Up! You are now level {}", level),
        ));
    }

    gained
}
