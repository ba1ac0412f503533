//! Ordered composition of color transforms

use super::ColorTransform;

/// Combine transforms into one equivalent transform.
///
/// `transforms[0]` is applied to the pixel first, then `transforms[1]` to
/// its result, and so on. Order matters: composition is not commutative.
pub fn compose(transforms: &[ColorTransform]) -> ColorTransform {
    match transforms {
        [] => ColorTransform::identity(),
        [only] => *only,
        [first, rest @ ..] => rest.iter().fold(*first, |acc, next| acc.then(next)),
    }
}
