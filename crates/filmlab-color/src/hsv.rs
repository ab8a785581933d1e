//! HSV conversions.
//!
//! Hue in `[0, 1)` (fraction of a turn), saturation and value in `[0, 1]`.

/// RGB to HSV.
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= 0.0 {
        return [0.0, s, max];
    }

    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    [h / 6.0, s, max]
}

/// HSV to RGB.
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    if s <= 0.0 {
        return [v, v, v];
    }
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as i32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Scales HSV saturation by `factor`, clamping it to `[0, 1]`.
#[inline]
pub fn scale_saturation(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    let mut hsv = rgb_to_hsv(rgb);
    hsv[1] = (hsv[1] * factor).clamp(0.0, 1.0);
    hsv_to_rgb(hsv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip() {
        for rgb in [[0.9, 0.1, 0.3], [0.2, 0.7, 0.4], [0.1, 0.2, 0.8], [0.5, 0.5, 0.5]] {
            let back = hsv_to_rgb(rgb_to_hsv(rgb));
            for c in 0..3 {
                assert!((back[c] - rgb[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_desaturate() {
        let grey = scale_saturation([0.8, 0.2, 0.4], 0.0);
        assert!((grey[0] - grey[1]).abs() < 1e-6 && (grey[1] - grey[2]).abs() < 1e-6);
        assert!((grey[0] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_primary_hues() {
        assert!((rgb_to_hsv([1.0, 0.0, 0.0])[0]).abs() < 1e-6);
        assert_relative_eq!(rgb_to_hsv([0.0, 1.0, 0.0])[0], 1.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(rgb_to_hsv([0.0, 0.0, 1.0])[0], 2.0 / 3.0, epsilon = 1e-6);
    }
}
