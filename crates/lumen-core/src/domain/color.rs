//! Color model and the white-point conversion used by light drivers.
//!
//! On the wire, color is four u16 channels (HSBK: hue, saturation,
//! brightness, kelvin).  A driver that actually renders light wants small
//! display-space values instead, and it wants the kelvin channel folded in:
//! an unsaturated color with a kelvin value is a *white point*, not gray,
//! so its effective hue and saturation come from the black-body curve.
//!
//! [`display_levels`] is the one conversion this crate offers.  The
//! kelvin-to-RGB approximation follows Tanner Helland's published curve
//! fit; the RGB-to-HSV step is the textbook sector formula.

/// A color in wire representation: four full-range u16 channels.
///
/// `kelvin` only matters when `saturation` is (effectively) zero; see
/// [`display_levels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsbk {
    /// Hue, 0..=65535 wrapping around the color wheel.
    pub hue: u16,
    /// Saturation, 0 (white/gray) ..= 65535 (fully saturated).
    pub saturation: u16,
    /// Brightness, 0 (off) ..= 65535 (full).
    pub brightness: u16,
    /// White-point temperature in kelvin, typically 2500..=9000.
    pub kelvin: u16,
}

/// Display-space levels a driver can apply directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLevels {
    /// Hue in whole degrees, 0..=359.
    pub hue_degrees: u16,
    /// Saturation, 0..=255.
    pub saturation: u8,
    /// Brightness, 0..=255.
    pub brightness: u8,
}

impl DisplayLevels {
    /// Everything at zero: the visible result of power-off.
    pub const OFF: DisplayLevels = DisplayLevels {
        hue_degrees: 0,
        saturation: 0,
        brightness: 0,
    };
}

/// Converts wire-space color plus a power level into display-space levels.
///
/// - Power 0 fades to black regardless of color.
/// - Hue maps 0..65535 → 0..359, saturation and brightness map
///   0..65535 → 0..255, all by truncating integer proportion.
/// - When `kelvin` is nonzero and the mapped saturation lands on zero, the
///   white point substitutes hue and saturation via the black-body curve;
///   brightness keeps the requested level.
pub fn display_levels(color: &Hsbk, power: u16) -> DisplayLevels {
    if power == 0 {
        return DisplayLevels::OFF;
    }

    let mut hue_degrees = scale(color.hue, 359) as u16;
    let mut saturation = scale(color.saturation, 255) as u8;
    let brightness = scale(color.brightness, 255) as u8;

    if color.kelvin > 0 && saturation == 0 {
        let rgb = kelvin_to_rgb(color.kelvin);
        let hsv = rgb_to_hsv(rgb);
        hue_degrees = hsv.hue_degrees as u16;
        saturation = (hsv.saturation * 255.0) as u8;
    }

    DisplayLevels {
        hue_degrees,
        saturation,
        brightness,
    }
}

/// Truncating proportional map from 0..=65535 onto 0..=out_max.
fn scale(value: u16, out_max: u32) -> u32 {
    u32::from(value) * out_max / 65535
}

// ── Black-body curve ──────────────────────────────────────────────────────────

/// RGB channels kept as f64 so the HSV step loses no precision.
struct RgbChannels {
    red: f64,
    green: f64,
    blue: f64,
}

/// HSV with hue in degrees and saturation/value normalized to the input
/// channel scale.
struct HsvChannels {
    hue_degrees: f64,
    saturation: f64,
}

/// Approximates the RGB color of a black-body radiator at `kelvin`.
///
/// Curve-fit constants are Tanner Helland's; valid for roughly
/// 1000 K..=40000 K, clamped per channel to 0..=255.
fn kelvin_to_rgb(kelvin: u16) -> RgbChannels {
    let temperature = f64::from(kelvin) / 100.0;

    let red = if temperature <= 66.0 {
        255.0
    } else {
        329.698727446 * (temperature - 60.0).powf(-0.1332047592)
    };

    let green = if temperature <= 66.0 {
        99.4708025861 * temperature.ln() - 161.1195681661
    } else {
        288.1221695283 * (temperature - 60.0).powf(-0.0755148492)
    };

    let blue = if temperature >= 66.0 {
        255.0
    } else if temperature <= 19.0 {
        0.0
    } else {
        138.5177312231 * (temperature - 10.0).ln() - 305.0447927307
    };

    RgbChannels {
        red: red.clamp(0.0, 255.0),
        green: green.clamp(0.0, 255.0),
        blue: blue.clamp(0.0, 255.0),
    }
}

/// Standard sector-based RGB→HSV conversion.
///
/// Scale-independent: only hue (degrees) and saturation (0..=1) are
/// produced, so callers can feed 0..=255 channels straight in.
fn rgb_to_hsv(rgb: RgbChannels) -> HsvChannels {
    let max = rgb.red.max(rgb.green).max(rgb.blue);
    let min = rgb.red.min(rgb.green).min(rgb.blue);
    let delta = max - min;

    if delta < 0.00001 || max <= 0.0 {
        // Gray (or black): hue is undefined, report the neutral axis.
        return HsvChannels {
            hue_degrees: 0.0,
            saturation: 0.0,
        };
    }

    let mut hue = if rgb.red >= max {
        (rgb.green - rgb.blue) / delta
    } else if rgb.green >= max {
        2.0 + (rgb.blue - rgb.red) / delta
    } else {
        4.0 + (rgb.red - rgb.green) / delta
    };

    hue *= 60.0;
    if hue < 0.0 {
        hue += 360.0;
    }

    HsvChannels {
        hue_degrees: hue,
        saturation: delta / max,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
