//! Tests for pixel difference metrics and weight handling

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use ndarray::Array3;
    use seamweave::analysis::metrics::{
        Metrics, ScoreWeights, StructureProfile, WeightOverrides, luminance, rgb_l1, rgb_l2,
        score_pair, sobel_l1, sobel_magnitude, to_float_rgb,
    };

    // Tests conversion scales to the unit interval
    // Verified by dividing by 256
    #[test]
    fn test_to_float_rgb_range() {
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 0, 51]));
        let a = to_float_rgb(&img);
        assert_eq!(a.dim(), (2, 3, 3));
        assert!(a.get((1, 2, 0)).is_some_and(|v| (*v - 1.0).abs() < 1e-6));
        assert!(a.get((1, 2, 2)).is_some_and(|v| (*v - 0.2).abs() < 1e-6));
    }

    // Tests L1 and L2 on constant offsets
    // Verified by averaging over pixels but not channels
    #[test]
    fn test_rgb_l1_l2_constant_offset() {
        let a = Array3::<f32>::zeros((4, 4, 3));
        let b = Array3::<f32>::from_elem((4, 4, 3), 0.5);
        assert!((rgb_l1(a.view(), b.view()) - 0.5).abs() < 1e-9);
        assert!((rgb_l2(a.view(), b.view()) - 0.25).abs() < 1e-9);
        assert!(rgb_l1(a.view(), a.view()).abs() < f64::EPSILON);
    }

    // Tests arrays of different shapes compare over the common region
    // Verified by comparing full arrays and panicking on mismatch
    #[test]
    fn test_common_region() {
        let a = Array3::<f32>::zeros((4, 6, 3));
        let b = Array3::<f32>::ones((2, 2, 3));
        assert!((rgb_l1(a.view(), b.view()) - 1.0).abs() < 1e-9);
        let empty = Array3::<f32>::zeros((0, 0, 3));
        assert!(rgb_l1(a.view(), empty.view()).abs() < f64::EPSILON);
    }

    fn l1_against_quarter(a: ndarray::ArrayView3<'_, f32>) -> f64 {
        let b = Array3::<f32>::from_elem((3, 5, 3), 0.25);
        rgb_l1(a, b.view())
    }

    // Tests the common region is the top-left corner and views need not share a lifetime
    // Verified by comparing the bottom-right corner instead
    #[test]
    fn test_common_region_top_left() {
        let a = Array3::from_shape_fn((6, 4, 3), |(y, x, _)| if y < 3 && x < 4 { 0.25 } else { 0.9 });
        assert!(l1_against_quarter(a.view()).abs() < 1e-9);
        let shifted = Array3::from_shape_fn((6, 4, 3), |(y, _, _)| if y < 3 { 0.75 } else { 0.25 });
        assert!((l1_against_quarter(shifted.view()) - 0.5).abs() < 1e-6);
    }

    // Tests Sobel magnitude is zero on flat images and positive on edges
    // Verified by skipping edge replication
    #[test]
    fn test_sobel_magnitude() {
        let flat = Array3::<f32>::from_elem((5, 5, 3), 0.3);
        let m = sobel_magnitude(&luminance(flat.view()));
        assert!(m.iter().all(|v| v.abs() < 1e-6));
        let edge = Array3::from_shape_fn((5, 6, 3), |(_, x, _)| if x < 3 { 0.0 } else { 1.0 });
        let e = sobel_magnitude(&luminance(edge.view()));
        assert!(e.get((2, 2)).is_some_and(|v| *v > 1.0));
        assert!(e.get((2, 0)).is_some_and(|v| v.abs() < 1e-6));
        assert!(sobel_l1(flat.view(), edge.view()) > 0.0);
    }

    // Tests weighted score combines metrics linearly
    // Verified by ignoring the L2 weight
    #[test]
    fn test_weighted_and_score_pair() {
        let m = Metrics {
            rgb_l1: 1.0,
            rgb_l2: 2.0,
            sobel_l1: 4.0,
        };
        let w = ScoreWeights {
            rgb_l1: 1.0,
            rgb_l2: 0.5,
            sobel_l1: 0.25,
        };
        assert!((m.weighted(&w) - 3.0).abs() < 1e-12);

        let a = Array3::<f32>::zeros((3, 3, 3));
        let b = Array3::<f32>::ones((3, 3, 3));
        let no_sobel = ScoreWeights {
            sobel_l1: 0.0,
            ..ScoreWeights::default()
        };
        let (score, metrics) = score_pair(a.view(), b.view(), &no_sobel);
        assert!(metrics.sobel_l1.abs() < f64::EPSILON);
        assert!((score - (no_sobel.rgb_l1 + no_sobel.rgb_l2)).abs() < 1e-9);
    }

    // Tests overrides zero unspecified keys and ignore non-finite values
    // Verified by merging with defaults
    #[test]
    fn test_weight_overrides() {
        let defaults = ScoreWeights::default();
        assert_eq!(WeightOverrides::default().resolve(defaults), defaults);
        let only_l1 = WeightOverrides {
            rgb_l1: Some(2.0),
            rgb_l2: Some(f64::NAN),
            sobel_l1: None,
        };
        let w = only_l1.resolve(defaults);
        assert!((w.rgb_l1 - 2.0).abs() < f64::EPSILON);
        assert!(w.rgb_l2.abs() < f64::EPSILON);
        assert!(w.sobel_l1.abs() < f64::EPSILON);
    }

    // Tests profile weight tables
    // Verified by swapping the two profiles
    #[test]
    fn test_structure_profiles() {
        let photo = StructureProfile::Photographic.weights();
        assert!((photo.sobel_l1 - 1.0).abs() < f64::EPSILON);
        assert!((photo.rgb_l1 - 0.15).abs() < f64::EPSILON);
        let whitebox = StructureProfile::Whitebox.weights();
        assert!((whitebox.rgb_l1 - 1.0).abs() < f64::EPSILON);
        assert!((whitebox.sobel_l1 - 0.5).abs() < f64::EPSILON);
        assert_eq!(StructureProfile::default(), StructureProfile::Photographic);
    }
}
