//! Color type and distance metric used by the tile matcher.

/// An 8-bit RGB triple, as found in palette records and source pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a color from its components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb { r, g, b }
    }
}

/// Squared Euclidean distance between two colors in RGB space.
///
/// The square root is skipped: it is strictly monotonic on non-negative
/// values, so minimizing the squared distance selects the same entry (and
/// breaks ties the same way) as minimizing the true distance.
pub fn distance_squared(a: Rgb, b: Rgb) -> u32 {
    let dr = a.r as i32 - b.r as i32;
    let dg = a.g as i32 - b.g as i32;
    let db = a.b as i32 - b.b as i32;
    (dr * dr + dg * dg + db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let c = Rgb::new(12, 200, 7);
        assert_eq!(distance_squared(c, c), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Rgb::new(255, 0, 10);
        let b = Rgb::new(0, 128, 200);
        assert_eq!(distance_squared(a, b), distance_squared(b, a));
    }

    #[test]
    fn distance_matches_hand_computed_value() {
        // (255-250)^2 + (0-3)^2 + (0-4)^2 = 25 + 9 + 16
        let a = Rgb::new(255, 0, 0);
        let b = Rgb::new(250, 3, 4);
        assert_eq!(distance_squared(a, b), 50);
    }

    #[test]
    fn extreme_corners_do_not_overflow() {
        let black = Rgb::new(0, 0, 0);
        let white = Rgb::new(255, 255, 255);
        assert_eq!(distance_squared(black, white), 3 * 255 * 255);
    }
}
