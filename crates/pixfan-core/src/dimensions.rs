//! Target geometry shared by the worker (which derives) and the tests that
//! check the naming contract.

fn round_div(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Height of the `width`-wide derivative of an `original_width` x
/// `original_height` source: `round(width * original_height / original_width)`,
/// halves rounded up, never below 1.
///
/// Integer arithmetic keeps every worker run in exact agreement.
pub fn target_height(width: u32, original_width: u32, original_height: u32) -> u32 {
    if original_width == 0 {
        return 1;
    }
    let height = round_div(
        u64::from(width) * u64::from(original_height),
        u64::from(original_width),
    );
    height.clamp(1, u64::from(u32::MAX)) as u32
}

/// Largest size with the source aspect ratio that fits inside the
/// `box_width` x `box_height` box. Never exceeds the box in either dimension.
///
/// For a box built with [`target_height`] the result is the box itself unless
/// the height was rounded down, in which case the width may shrink by a pixel.
pub fn fit_inside(
    original_width: u32,
    original_height: u32,
    box_width: u32,
    box_height: u32,
) -> (u32, u32) {
    let box_width = box_width.max(1);
    let box_height = box_height.max(1);
    if original_width == 0 || original_height == 0 {
        return (box_width, box_height);
    }
    let (ow, oh) = (u64::from(original_width), u64::from(original_height));
    let (bw, bh) = (u64::from(box_width), u64::from(box_height));

    // Width-bound when bw/ow <= bh/oh.
    let (width, height) = if bw * oh <= bh * ow {
        (bw, round_div(bw * oh, ow))
    } else {
        (round_div(bh * ow, oh), bh)
    };
    (width.clamp(1, bw) as u32, height.clamp(1, bh) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_height_reference_cases() {
        assert_eq!(target_height(150, 800, 600), 113);
        assert_eq!(target_height(320, 800, 600), 240);
        assert_eq!(target_height(640, 800, 600), 480);
        assert_eq!(target_height(1024, 800, 600), 768);
    }

    #[test]
    fn test_target_height_rounds_half_up() {
        // 3 * 1 / 2 = 1.5
        assert_eq!(target_height(3, 2, 1), 2);
        // 5 * 3 / 10 = 1.5
        assert_eq!(target_height(5, 10, 3), 2);
        // 1 * 1 / 4 = 0.25 -> clamped to 1
        assert_eq!(target_height(1, 4, 1), 1);
    }

    #[test]
    fn test_target_height_aspect_error_bound() {
        let sources = [(800, 600), (1920, 1080), (333, 777), (4000, 3), (1, 1), (7, 5000)];
        let widths = [1, 2, 150, 320, 640, 1024, 4096];
        for &(ow, oh) in &sources {
            for &w in &widths {
                let h = target_height(w, ow, oh);
                let exact = f64::from(w) * f64::from(oh) / f64::from(ow);
                if exact < 0.5 {
                    // Degenerate: the exact height rounds to zero and is clamped.
                    assert_eq!(h, 1);
                    continue;
                }
                // Rounding keeps H within 1/2 of the exact height.
                assert!((f64::from(h) - exact).abs() <= 0.5 + 1e-9, "{}x{} w={}", ow, oh, w);
                let ratio_err = (f64::from(w) / f64::from(h) - f64::from(ow) / f64::from(oh)).abs();
                let bound = (f64::from(ow) / f64::from(oh)) * 0.5 / f64::from(h);
                assert!(ratio_err <= bound + 1e-9, "{}x{} w={}", ow, oh, w);
            }
        }
    }

    #[test]
    fn test_target_height_is_deterministic() {
        for w in 1..500 {
            assert_eq!(target_height(w, 1234, 987), target_height(w, 1234, 987));
        }
    }

    #[test]
    fn test_fit_inside_exact_box() {
        assert_eq!(fit_inside(800, 600, 150, 113), (150, 113));
        assert_eq!(fit_inside(800, 600, 320, 240), (320, 240));
    }

    #[test]
    fn test_fit_inside_never_exceeds_box() {
        let (w, h) = fit_inside(1000, 1000, 300, 200);
        assert_eq!((w, h), (200, 200));
        let (w, h) = fit_inside(1000, 10, 150, 2);
        assert!(w <= 150 && h <= 2);
    }

    #[test]
    fn test_fit_inside_height_rounded_down() {
        // 4 * 1 / 3 = 1.33 -> box 4x1, the source aspect only fills 3x1
        assert_eq!(fit_inside(3, 1, 4, target_height(4, 3, 1)), (3, 1));
    }

    #[test]
    fn test_fit_inside_upscale_is_deterministic() {
        assert_eq!(fit_inside(100, 50, 200, 100), (200, 100));
    }
}
