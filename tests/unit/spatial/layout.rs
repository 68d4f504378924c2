//! Tests for overlap margins, geometry and metadata resolution

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use seamweave::spatial::grid::{TileCoord, TileGrid};
    use seamweave::spatial::layout::{
        LayoutMetadata, TileGeometry, TileSize, margin_pixels, resolve_geometry, validate_overlap,
    };
    use seamweave::spatial::tiles::MemoryTiles;

    // Tests margin formula on known sizes
    // Verified by dropping the denominator
    #[test]
    fn test_margin_pixels_examples() {
        assert_eq!(margin_pixels(512, 0.0), 0);
        assert_eq!(margin_pixels(512, 0.25), 85);
        assert_eq!(margin_pixels(300, 0.1), 25);
        assert_eq!(margin_pixels(100, -0.2), 0);
        assert_eq!(margin_pixels(100, f64::NAN), 0);
    }

    // Tests margin never exceeds half the tile
    // Verified by removing the clamp
    #[test]
    fn test_margin_clamped() {
        for size in [1, 2, 7, 64, 513] {
            assert!(margin_pixels(size, 0.48) <= size / 2);
        }
    }

    // Tests overlap validation range
    // Verified by accepting 0.49
    #[test]
    fn test_validate_overlap() {
        assert!(validate_overlap(0.0).is_ok());
        assert!(validate_overlap(0.3).is_ok());
        assert!(validate_overlap(0.49).is_err());
        assert!(validate_overlap(-0.1).is_err());
        assert!(validate_overlap(f64::INFINITY).is_err());
    }

    // Tests cropped size removes both margins
    // Verified by removing one margin only
    #[test]
    fn test_cropped_size() {
        let g = TileGeometry::new(512, 256, 0.25);
        assert_eq!(g.cropped_width(), 512 - 2 * 85);
        assert_eq!(g.cropped_height(), 256 - 2 * g.margin_y);
    }

    // Tests explicit overlap wins over metadata and size comes from metadata
    // Verified by preferring metadata overlap
    #[test]
    fn test_resolve_geometry_precedence() {
        let grid = TileGrid::from_coords([TileCoord::new(0, 0)]).expect("grid");
        let store = MemoryTiles::new();
        let metadata = LayoutMetadata {
            overlap: Some(0.1),
            tile_size: Some(TileSize { w: 300, h: 300 }),
        };
        let (geometry, overlap) =
            resolve_geometry(Some(&metadata), Some(0.25), &store, &grid).expect("geometry");
        assert!((overlap - 0.25).abs() < f64::EPSILON);
        assert_eq!(geometry.width, 300);
        let (_, from_metadata) =
            resolve_geometry(Some(&metadata), None, &store, &grid).expect("geometry");
        assert!((from_metadata - 0.1).abs() < f64::EPSILON);
    }

    // Tests tile size falls back to the first decodable tile
    // Verified by defaulting the size to zero
    #[test]
    fn test_resolve_geometry_from_tile() {
        let coord = TileCoord::new(1, 1);
        let grid = TileGrid::from_coords([coord]).expect("grid");
        let store = MemoryTiles::new().with(coord, RgbImage::from_pixel(40, 24, Rgb([0, 0, 0])));
        let (geometry, overlap) = resolve_geometry(None, None, &store, &grid).expect("geometry");
        assert_eq!((geometry.width, geometry.height), (40, 24));
        assert!(overlap.abs() < f64::EPSILON);
        let empty = MemoryTiles::new();
        assert!(resolve_geometry(None, None, &empty, &grid).is_err());
    }

    // Tests metadata file parsing and absence
    // Verified by requiring the file
    #[test]
    fn test_layout_metadata_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(LayoutMetadata::load(dir.path()).expect("absent"), None);
        std::fs::write(
            dir.path().join("tilejson.json"),
            r#"{"overlap": 0.2, "tile_size": {"w": 256, "h": 128}, "name": "x"}"#,
        )
        .expect("write");
        let metadata = LayoutMetadata::load(dir.path()).expect("load").expect("present");
        assert_eq!(metadata.overlap, Some(0.2));
        assert_eq!(metadata.tile_size, Some(TileSize { w: 256, h: 128 }));
    }
}
