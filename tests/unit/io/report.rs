//! Tests for report summaries and JSON persistence

#[cfg(test)]
mod tests {
    use seamweave::io::report::{GeometrySummary, GridSummary, UnitFailure, read_json, write_json};
    use seamweave::oracle::error::OracleError;
    use seamweave::spatial::grid::{TileCoord, TileGrid};
    use seamweave::spatial::layout::TileGeometry;

    // Tests grid summary counts gaps and missing tiles
    // Verified by counting only present tiles
    #[test]
    fn test_grid_summary_with_gap() {
        let grid = TileGrid::from_coords([
            TileCoord::new(0, 0),
            TileCoord::new(2, 0),
            TileCoord::new(0, 1),
        ])
        .expect("grid");
        let summary = GridSummary::of(&grid);
        assert_eq!(summary.columns, 3);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.tiles, 3);
        assert_eq!(summary.missing_tiles, 3);
        assert_eq!(summary.gaps.x, vec![1]);
        assert!(summary.gaps.y.is_empty());
    }

    // Tests geometry summary reports cropped size
    // Verified by reporting the full tile width
    #[test]
    fn test_geometry_summary() {
        let summary = GeometrySummary::of(TileGeometry::new(100, 60, 0.2), 0.2);
        assert_eq!(summary.cropped_width, 100 - 2 * summary.tile.margin_x);
        assert_eq!(summary.cropped_height, 60 - 2 * summary.tile.margin_y);
    }

    // Tests JSON written atomically reads back equal
    // Verified by writing compact JSON without a trailing newline
    #[test]
    fn test_write_and_read_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("report.json");
        let failure = UnitFailure {
            unit: "window 3".to_string(),
            error: OracleError::from_status(503, "Service Unavailable"),
        };
        write_json(&path, &failure).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.ends_with('\n'));
        let back: UnitFailure = read_json(&path).expect("parse");
        assert_eq!(back, failure);
    }

    // Tests malformed JSON is reported with its path
    // Verified by dropping the path context
    #[test]
    fn test_read_json_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").expect("write");
        let err = read_json::<UnitFailure>(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
