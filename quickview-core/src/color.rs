//! Color mapping - pure translation of span counts to gradient colors
//!
//! Global invariants enforced:
//! - Stateless and total over all representable inputs
//! - For a fixed total, more specialized hits never move the hue away from
//!   the success end of the ramp
//! - Theme selection may shift luminance, never hue family

use crate::location::Counts;
use std::fmt;

/// The two palette switches threaded through from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteConfig {
    /// Run the gradient red to blue instead of red to green
    pub alternate_hue: bool,
    /// Render against a dark canvas
    pub dark: bool,
}

/// A 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color for spans no recorded event covers: the page background on the
/// light theme, the default foreground on the dark theme. Independent of
/// the hue choice.
pub const UNTOUCHED: Rgb = Rgb {
    r: 0xff,
    g: 0xff,
    b: 0xff,
};

/// Map a span's counts to its color under the given palette.
///
/// The specialization hit rate selects a hue along a continuous ramp: 0 is
/// pure red, 1 is pure green (or pure blue with the alternate hue), passing
/// through orange and yellow between. The ramp is fully saturated; the dark
/// theme lifts lightness to keep contrast without changing hue.
pub fn span_color(counts: Counts, palette: PaletteConfig) -> Rgb {
    if counts.is_untouched() {
        return UNTOUCHED;
    }
    // Red sits at hue 0, green at 1/3; the hit rate walks between them
    let mut hue = counts.hit_rate() / 3.0;
    if palette.alternate_hue {
        // Negating the hue walks the wheel the other way, toward blue at -1/3
        hue = -hue;
    }
    let lightness = if palette.dark { 0.6 } else { 0.5 };
    hls_to_rgb(hue, lightness, 1.0)
}

/// Standard HLS to RGB conversion; hue wraps modulo 1.
pub fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> Rgb {
    if saturation == 0.0 {
        let v = to_channel(lightness);
        return Rgb { r: v, g: v, b: v };
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = 2.0 * lightness - m2;
    Rgb {
        r: to_channel(hue_component(m1, m2, hue + 1.0 / 3.0)),
        g: to_channel(hue_component(m1, m2, hue)),
        b: to_channel(hue_component(m1, m2, hue - 1.0 / 3.0)),
    }
}

fn hue_component(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn to_channel(value: f64) -> u8 {
    (255.0 * value.clamp(0.0, 1.0)) as u8
}
