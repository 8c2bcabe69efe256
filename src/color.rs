use palette::Srgb;
use palette::named;

use crate::data::model::Metric;

// ---------------------------------------------------------------------------
// Metric colours
// ---------------------------------------------------------------------------

/// Fixed display colour of a metric series.
pub fn metric_color(metric: Metric) -> Srgb<u8> {
    match metric {
        Metric::FarRed => named::ORANGE,
        Metric::Red => named::RED,
        Metric::Uv => named::BLUE,
        Metric::Dual => named::GREEN,
    }
}

/// `#rrggbb` form for renderers.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_colours_are_stable_hex() {
        assert_eq!(to_hex(metric_color(Metric::FarRed)), "#ffa500");
        assert_eq!(to_hex(metric_color(Metric::Red)), "#ff0000");
        assert_eq!(to_hex(metric_color(Metric::Uv)), "#0000ff");
        assert_eq!(to_hex(metric_color(Metric::Dual)), "#008000");
    }
}
