//! Tests for seam heatmap painting and colour mapping

#[cfg(test)]
mod tests {
    use image::Rgb;
    use seamweave::analysis::seams::SeamRecord;
    use seamweave::io::heatmap::{SeamHeatmap, colormap_hot};
    use seamweave::spatial::grid::{SeamPair, TileCoord};
    use seamweave::spatial::layout::TileGeometry;

    // Tests colour ramp end points
    // Verified by reversing the ramp
    #[test]
    fn test_colormap_hot_endpoints() {
        assert_eq!(colormap_hot(0.0), Rgb([0, 0, 0]));
        assert_eq!(colormap_hot(1.0), Rgb([255, 255, 255]));
        assert_eq!(colormap_hot(0.5), Rgb([255, 0, 0]));
        assert_eq!(colormap_hot(-3.0), colormap_hot(0.0));
    }

    // Tests heatmap size follows the cropped layout
    // Verified by using the full tile size
    #[test]
    fn test_heatmap_dimensions_use_cropped_tiles() {
        let geometry = TileGeometry::new(40, 40, 0.25);
        let heatmap = SeamHeatmap::new(geometry, TileCoord::new(0, 0), 3, 2);
        assert_eq!(heatmap.width(), geometry.cropped_width() * 3);
        assert_eq!(heatmap.height(), geometry.cropped_height() * 2);
    }

    // Tests a vertical seam paints the two columns around the shared edge
    // Verified by painting only the left column
    #[test]
    fn test_vertical_seam_painted_on_edge() {
        let geometry = TileGeometry::new(8, 8, 0.0);
        let mut heatmap = SeamHeatmap::new(geometry, TileCoord::new(5, 5), 2, 1);
        heatmap.paint(&SeamRecord {
            pair: SeamPair::vertical(TileCoord::new(5, 5)),
            score: 1.0,
            profile: vec![0.5; 8],
        });
        let img = heatmap.render();
        assert_eq!(img.get_pixel(7, 3), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(8, 3), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(0, 3), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(15, 0), &Rgb([0, 0, 0]));
    }

    // Tests an empty heatmap renders black
    // Verified by defaulting unpainted pixels to the ramp start colour
    #[test]
    fn test_empty_heatmap_black() {
        let geometry = TileGeometry::new(4, 4, 0.0);
        let img = SeamHeatmap::new(geometry, TileCoord::new(0, 0), 2, 2).render();
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
