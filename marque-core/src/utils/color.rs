//! Tag color helpers
//!
//! New tags get a generated pastel color so adjacent tags stay visually
//! distinct without user input. Hue is random; saturation and value are
//! pinned to the pastel band.

use rand::Rng;

const PASTEL_SATURATION: f32 = 0.45;
const PASTEL_VALUE: f32 = 0.92;

/// Convert HSV to RGB
///
/// `h` in degrees (0-360), `s` and `v` in 0-1.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r_prime, g_prime, b_prime) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let r = ((r_prime + m) * 255.0).round() as u8;
    let g = ((g_prime + m) * 255.0).round() as u8;
    let b = ((b_prime + m) * 255.0).round() as u8;

    (r, g, b)
}

/// Generate a random pastel color as `#RRGGBB`
pub fn random_pastel() -> String {
    let hue: f32 = rand::thread_rng().gen_range(0.0..360.0);
    let (r, g, b) = hsv_to_rgb(hue, PASTEL_SATURATION, PASTEL_VALUE);
    format!("#{r:02X}{g:02X}{b:02X}")
}
