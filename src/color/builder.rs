//! Elementary color transforms
//!
//! Each builder takes a single tunable parameter and never fails:
//! out-of-range values are either clamped (sepia, tint intensity) or
//! accepted as-is and clamp visually once applied.

use super::{ColorTransform, ALPHA_ROW};

/// Luminance weights for (R, G, B) used by `saturation`
pub const LUMINANCE: [f32; 3] = [0.3086, 0.6094, 0.0820];

/// Classic sepia kernel (rows are output R, G, B)
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Temperature shift applied to red (warm) or blue (cool) per unit of amount
const TEMPERATURE_SHIFT: f32 = 30.0;

/// Green shift per unit of |amount|
const TEMPERATURE_GREEN_SHIFT: f32 = 10.0;

/// No-op transform
pub fn identity() -> ColorTransform {
    ColorTransform::identity()
}

/// Add `amount` to R, G and B
pub fn brightness(amount: f32) -> ColorTransform {
    ColorTransform::from_rows([
        [1.0, 0.0, 0.0, 0.0, amount],
        [0.0, 1.0, 0.0, 0.0, amount],
        [0.0, 0.0, 1.0, 0.0, amount],
        ALPHA_ROW,
    ])
}

/// Scale R, G, B around mid-gray
/// - 1.0 = no change
/// - < 1.0 flattens, > 1.0 boosts
pub fn contrast(factor: f32) -> ColorTransform {
    let translate = (-0.5 * factor + 0.5) * 255.0;
    ColorTransform::from_rows([
        [factor, 0.0, 0.0, 0.0, translate],
        [0.0, factor, 0.0, 0.0, translate],
        [0.0, 0.0, factor, 0.0, translate],
        ALPHA_ROW,
    ])
}

/// Blend each channel toward luminance-weighted gray
/// - 0.0 = grayscale, 1.0 = no change, > 1.0 = more saturated
pub fn saturation(factor: f32) -> ColorTransform {
    let inv = 1.0 - factor;
    let [sr, sg, sb] = LUMINANCE.map(|w| w * inv);
    ColorTransform::from_rows([
        [sr + factor, sg, sb, 0.0, 0.0],
        [sr, sg + factor, sb, 0.0, 0.0],
        [sr, sg, sb + factor, 0.0, 0.0],
        ALPHA_ROW,
    ])
}

/// Warm (positive) or cool (negative) white-balance shift.
///
/// Green gets a small lift from |amount| whatever the sign.
pub fn temperature(amount: f32) -> ColorTransform {
    let red = if amount > 0.0 { amount * TEMPERATURE_SHIFT } else { 0.0 };
    let blue = if amount < 0.0 { -amount * TEMPERATURE_SHIFT } else { 0.0 };
    let green = amount.abs() * TEMPERATURE_GREEN_SHIFT;
    ColorTransform::from_rows([
        [1.0, 0.0, 0.0, 0.0, red],
        [0.0, 1.0, 0.0, 0.0, green],
        [0.0, 0.0, 1.0, 0.0, blue],
        ALPHA_ROW,
    ])
}

/// Interpolate between identity and the sepia kernel. Intensity is clamped to [0, 1].
pub fn sepia(intensity: f32) -> ColorTransform {
    let t = intensity.clamp(0.0, 1.0);
    let mut rows = [[0.0; 5]; 4];
    for (i, row) in rows.iter_mut().take(3).enumerate() {
        for (j, value) in row.iter_mut().take(3).enumerate() {
            let base = if i == j { 1.0 - t } else { 0.0 };
            *value = base + SEPIA[i][j] * t;
        }
    }
    rows[3] = ALPHA_ROW;
    ColorTransform::from_rows(rows)
}

/// Blend each channel with a constant color component.
///
/// Row c is `balance + c*t` on the diagonal and `c*t` elsewhere,
/// where `t` is the clamped intensity and `balance = 1 - t`.
pub fn tint(r: f32, g: f32, b: f32, intensity: f32) -> ColorTransform {
    let t = intensity.clamp(0.0, 1.0);
    let balance = 1.0 - t;
    let mut rows = [[0.0; 5]; 4];
    for (i, component) in [r, g, b].into_iter().enumerate() {
        for j in 0..3 {
            let base = if i == j { balance } else { 0.0 };
            rows[i][j] = base + component * t;
        }
    }
    rows[3] = ALPHA_ROW;
    ColorTransform::from_rows(rows)
}
