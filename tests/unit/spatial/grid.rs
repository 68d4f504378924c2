//! Tests for sparse tile grid discovery, spans and adjacency

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use seamweave::io::image::save_png_atomic;
    use seamweave::spatial::grid::{SeamOrientation, SeamPair, TileCoord, TileGrid};
    use seamweave::spatial::tiles::TileLayer;

    fn grid(coords: &[(i32, i32)]) -> TileGrid {
        TileGrid::from_coords(coords.iter().map(|&(x, y)| TileCoord::new(x, y))).expect("grid")
    }

    // Tests span covers gaps between present indices
    // Verified by counting distinct indices instead of the range
    #[test]
    fn test_span_includes_gaps() {
        let g = grid(&[(3, 10), (5, 10), (3, 12)]);
        assert_eq!((g.min_x(), g.max_x()), (3, 5));
        assert_eq!(g.columns(), 3);
        assert_eq!(g.rows(), 3);
        assert_eq!(g.len(), 3);
        assert_eq!(g.missing_count(), 6);
        let gaps = g.gaps();
        assert_eq!(gaps.x, vec![4]);
        assert_eq!(gaps.y, vec![11]);
    }

    // Tests empty coordinate sets are rejected
    // Verified by returning an empty grid
    #[test]
    fn test_empty_grid_is_error() {
        assert!(TileGrid::from_coords(Vec::new()).is_err());
    }

    // Tests offsets relative to the span origin
    // Verified by returning absolute indices
    #[test]
    fn test_offset_of() {
        let g = grid(&[(-2, 4), (0, 5)]);
        assert_eq!(g.offset_of(TileCoord::new(-2, 4)), Some((0, 0)));
        assert_eq!(g.offset_of(TileCoord::new(0, 5)), Some((2, 1)));
        assert_eq!(g.offset_of(TileCoord::new(1, 5)), None);
        assert_eq!(g.column_of(-3), None);
        assert_eq!(g.row_of(5), Some(1));
    }

    // Tests present and span listings are row-major
    // Verified by sorting column-major
    #[test]
    fn test_row_major_order() {
        let g = grid(&[(1, 1), (0, 0), (1, 0)]);
        assert_eq!(
            g.present(),
            vec![TileCoord::new(0, 0), TileCoord::new(1, 0), TileCoord::new(1, 1)]
        );
        assert_eq!(g.span().len(), 4);
        assert_eq!(g.span().get(2), Some(&TileCoord::new(0, 1)));
    }

    // Tests windows clip to the span
    // Verified by skipping the clip against the maximum index
    #[test]
    fn test_window_clipped() {
        let g = grid(&[(0, 0), (3, 3)]);
        let w = g.window(2, 2, 5, 1);
        assert_eq!(w, vec![TileCoord::new(2, 2), TileCoord::new(3, 2)]);
        assert!(g.window(10, 10, 2, 2).is_empty());
    }

    // Tests adjacent pairs list vertical seams first
    // Verified by interleaving orientations
    #[test]
    fn test_adjacent_pairs_order() {
        let g = grid(&[(0, 0), (1, 1)]);
        let pairs = g.adjacent_pairs();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs.first(), Some(&SeamPair::vertical(TileCoord::new(0, 0))));
        assert_eq!(
            pairs.get(2).map(|p| p.orientation),
            Some(SeamOrientation::Horizontal)
        );
        let first = SeamPair::horizontal(TileCoord::new(0, 0));
        assert_eq!(first.second, TileCoord::new(0, 1));
    }

    // Tests scanning ignores non-numeric names and non-PNG files
    // Verified by parsing every directory entry
    #[test]
    fn test_scan_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = TileLayer::new(dir.path());
        let tile = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        for coord in [TileCoord::new(2, 7), TileCoord::new(3, 7)] {
            save_png_atomic(&tile, &layer.tile_path(coord)).expect("save");
        }
        std::fs::create_dir_all(dir.path().join("0").join("notes")).expect("dir");
        std::fs::write(dir.path().join("0").join("2").join("readme.txt"), "x").expect("file");
        let g = TileGrid::scan(dir.path()).expect("scan");
        assert_eq!(g.len(), 2);
        assert!(g.contains(TileCoord::new(3, 7)));
    }

    // Tests a layer without the zoom directory is structural
    // Verified by treating it as an empty grid
    #[test]
    fn test_scan_missing_zoom_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(TileGrid::scan(dir.path()).is_err());
    }

    // Tests neighbor helpers step one index
    // Verified by swapping left and right
    #[test]
    fn test_coord_neighbors() {
        let c = TileCoord::new(4, 9);
        assert_eq!(c.left(), TileCoord::new(3, 9));
        assert_eq!(c.top(), TileCoord::new(4, 8));
        assert_eq!(c.top_left(), TileCoord::new(3, 8));
        assert_eq!(c.right().left(), c);
        assert_eq!(c.bottom().top(), c);
    }
}
