//! Tests for linear fades, window masks and radial falloff

#[cfg(test)]
mod tests {
    use ndarray::Array1;
    use seamweave::math::ramp::{Sides, fade_axis, outer, radial_mask, window_weight};

    // Tests a fade-in and fade-out over the same pixels sum to one
    // Verified by using (i + 1) / n for the fade-in
    #[test]
    fn test_complementary_fades_sum_to_one() {
        let n = 8;
        let fade_in = fade_axis(2 * n, n, 0);
        let fade_out = fade_axis(2 * n, 0, n);
        for i in 0..n {
            let a = fade_in.get(i).copied().unwrap_or(0.0);
            let b = fade_out.get(n + i).copied().unwrap_or(0.0);
            assert!((a + b - 1.0).abs() < 1e-6, "position {i}: {a} + {b}");
        }
    }

    // Tests fade lengths clamp to half the axis
    // Verified by removing the clamp
    #[test]
    fn test_fade_axis_clamped() {
        let w = fade_axis(4, 10, 10);
        assert_eq!(w.len(), 4);
        assert!(w.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(w.get(0).is_some_and(|v| v.abs() < f32::EPSILON));
        let flat = fade_axis(5, 0, 0);
        assert!(flat.iter().all(|v| (*v - 1.0).abs() < f32::EPSILON));
    }

    // Tests outer product shape and values
    // Verified by transposing the result
    #[test]
    fn test_outer_shape() {
        let rows = Array1::from(vec![1.0, 0.5]);
        let cols = Array1::from(vec![1.0, 2.0, 3.0]);
        let m = outer(&rows, &cols);
        assert_eq!(m.dim(), (2, 3));
        assert!(m.get((1, 2)).is_some_and(|v| (*v - 1.5).abs() < f32::EPSILON));
    }

    // Tests windows keep full weight toward unbordered sides
    // Verified by fading every side
    #[test]
    fn test_window_weight_only_fades_bordered_sides() {
        let sides = Sides {
            left: false,
            right: true,
            top: false,
            bottom: false,
        };
        let m = window_weight(16, 8, 4, sides);
        assert!(m.get((0, 0)).is_some_and(|v| (*v - 1.0).abs() < f32::EPSILON));
        assert!(m.get((7, 0)).is_some_and(|v| (*v - 1.0).abs() < f32::EPSILON));
        assert!(m.get((3, 15)).is_some_and(|v| *v < 0.5));
    }

    // Tests radial mask peaks at the centre and vanishes at corners
    // Verified by using linear instead of quadratic falloff
    #[test]
    fn test_radial_mask() {
        let m = radial_mask(9, 9);
        assert!(m.get((4, 4)).is_some_and(|v| (*v - 1.0).abs() < 1e-6));
        assert!(m.get((0, 0)).is_some_and(|v| v.abs() < 1e-6));
        let near = m.get((4, 5)).copied().unwrap_or(0.0);
        assert!(near < 1.0 && near > 0.5);
    }
}
