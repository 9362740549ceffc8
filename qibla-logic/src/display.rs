use crate::bearing::normalize_degrees;

/// Human readable label for a relative direction, e.g. "20° towards Qibla"
pub fn direction_label(relative: f64) -> String {
    let rounded = normalize_degrees(relative).round();
    // 359.5 and up rounds to a full turn, adding 0 clears a negative zero
    let degrees = if rounded >= 360.0 { 0.0 } else { rounded + 0.0 };
    format!("{degrees:.0}° towards Qibla")
}
