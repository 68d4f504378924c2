//! Tests for weighted overlap-add compositing

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use ndarray::Array2;
    use seamweave::math::accumulator::{Uncovered, WeightBuffer};

    // Tests overlapping contributions average by weight
    // Verified by summing without dividing by the weight
    #[test]
    fn test_weighted_average() {
        let mut buffer = WeightBuffer::new(2, 1);
        let red = RgbImage::from_pixel(2, 1, Rgb([200, 0, 0]));
        let blue = RgbImage::from_pixel(1, 1, Rgb([0, 0, 100]));
        buffer.add(&red, 0, 0, &Array2::from_elem((1, 2), 1.0));
        buffer.add(&blue, 1, 0, &Array2::from_elem((1, 1), 3.0));
        let out = buffer.resolve(Uncovered::Background([0, 0, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([50, 0, 75]));
        assert!((buffer.weight_at(1, 0) - 4.0).abs() < 1e-6);
    }

    // Tests holes resolve to background or original pixels
    // Verified by always using black for holes
    #[test]
    fn test_uncovered_resolution() {
        let buffer = WeightBuffer::new(2, 2);
        assert!(!buffer.is_covered(0, 0));
        let filled = buffer.resolve(Uncovered::Background([255, 255, 255]));
        assert_eq!(filled.get_pixel(1, 1), &Rgb([255, 255, 255]));
        let original = RgbImage::from_pixel(2, 2, Rgb([3, 4, 5]));
        let kept = buffer.resolve(Uncovered::Original(&original));
        assert_eq!(kept, original);
    }

    // Tests contributions outside the buffer and zero weights are ignored
    // Verified by wrapping negative offsets
    #[test]
    fn test_out_of_bounds_ignored() {
        let mut buffer = WeightBuffer::new(2, 2);
        let tile = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        buffer.add(&tile, -1, -1, &Array2::from_elem((2, 2), 1.0));
        buffer.add(&tile, 0, 1, &Array2::zeros((2, 2)));
        assert!(buffer.is_covered(0, 0));
        assert!(!buffer.is_covered(1, 1));
        assert_eq!((buffer.width(), buffer.height()), (2, 2));
    }
}
