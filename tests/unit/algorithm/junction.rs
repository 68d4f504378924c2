//! Tests for crossing detection, patch geometry and the junction pass

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use seamweave::algorithm::junction::{
        JunctionConfig, junction_patch, junction_points, radial_composite, repair_junctions,
    };
    use seamweave::algorithm::retry::{RecordingSleeper, RetryPolicy, RetryingOracle};
    use seamweave::io::progress::NoProgress;
    use seamweave::oracle::interface::{OracleParams, StylizeRequest};
    use seamweave::oracle::stub::FnOracle;
    use std::cell::RefCell;

    fn params() -> OracleParams {
        OracleParams {
            prompt: "ink".to_string(),
            negative: None,
            strength: 0.35,
            steps: 10,
            guidance: 4.5,
        }
    }

    // Tests only interior crossings are listed in row-major order
    // Verified by including border crossings
    #[test]
    fn test_junction_points() {
        assert_eq!(junction_points(3, 2, 10, 20), vec![(10, 20), (20, 20)]);
        assert_eq!(junction_points(3, 3, 8, 8).len(), 4);
        assert!(junction_points(1, 4, 8, 8).is_empty());
    }

    // Tests patch clipping and the minimum size rule
    // Verified by dropping the minimum half size
    #[test]
    fn test_junction_patch() {
        assert_eq!(junction_patch((32, 32), 4, 64, 64), Some((24, 24, 40, 40)));
        assert_eq!(junction_patch((32, 32), 64, 64, 64), Some((0, 0, 64, 64)));
        assert_eq!(junction_patch((4, 32), 8, 64, 64), None);
    }

    // Tests strength boost clamping and step floor
    // Verified by skipping the clamp
    #[test]
    fn test_junction_params() {
        let config = JunctionConfig::default();
        let boosted = config.params(&params());
        assert!((boosted.strength - 0.40).abs() < 1e-9);
        assert_eq!(boosted.steps, 14);

        let saturated = JunctionConfig {
            strength_boost: 5.0,
            steps: 20,
            ..JunctionConfig::default()
        }
        .params(&params());
        assert!((saturated.strength - 1.0).abs() < 1e-12);
        assert_eq!(saturated.steps, 20);
    }

    // Tests the radial composite keeps corners and replaces the centre
    // Verified by using a flat mask
    #[test]
    fn test_radial_composite() {
        let original = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let stylized = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        let out = radial_composite(&stylized, &original);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
        assert!(out.get_pixel(8, 8).0[0] < 64);
    }

    // Tests the pass seeds crossings from the offset and counts outcomes
    // Verified by seeding from the window counter
    #[test]
    fn test_repair_junctions_seeds() {
        let seeds = RefCell::new(Vec::new());
        let oracle = FnOracle::new("dark", |request: &StylizeRequest<'_>| {
            seeds.borrow_mut().push(request.seed);
            let (w, h) = request.image.dimensions();
            Ok(RgbImage::from_pixel(w, h, Rgb([0, 0, 0])))
        });
        let mut retrying = RetryingOracle::new(&oracle)
            .with_policy(RetryPolicy::none(), Box::new(RecordingSleeper::default()));
        let mut mosaic = RgbImage::from_pixel(96, 64, Rgb([255, 255, 255]));
        let config = JunctionConfig {
            half: 16,
            ..JunctionConfig::default()
        };
        let stats = repair_junctions(
            &mut mosaic,
            (3, 2, 32, 32),
            &config,
            &params(),
            7,
            &mut retrying,
            &mut NoProgress,
        );
        assert_eq!((stats.total, stats.processed, stats.skipped), (2, 2, 0));
        assert_eq!(*seeds.borrow(), vec![100_007, 100_008]);
        assert!(mosaic.get_pixel(32, 32).0[0] < 128);
        assert_eq!(mosaic.get_pixel(0, 0).0, [255, 255, 255]);
    }

    // Tests disabled and capped passes
    // Verified by ignoring the enabled flag
    #[test]
    fn test_repair_junctions_disabled_and_capped() {
        let oracle = FnOracle::new("echo", |request: &StylizeRequest<'_>| {
            Ok(request.image.clone())
        });
        let mut retrying = RetryingOracle::new(&oracle)
            .with_policy(RetryPolicy::none(), Box::new(RecordingSleeper::default()));
        let mut mosaic = RgbImage::new(96, 96);
        let disabled = JunctionConfig {
            enabled: false,
            ..JunctionConfig::default()
        };
        let stats = repair_junctions(
            &mut mosaic,
            (3, 3, 32, 32),
            &disabled,
            &params(),
            0,
            &mut retrying,
            &mut NoProgress,
        );
        assert_eq!((stats.total, stats.processed), (4, 0));
        assert_eq!(oracle.calls(), 0);

        let capped = JunctionConfig {
            max_junctions: 1,
            ..JunctionConfig::default()
        };
        let stats = repair_junctions(
            &mut mosaic,
            (3, 3, 32, 32),
            &capped,
            &params(),
            0,
            &mut retrying,
            &mut NoProgress,
        );
        assert_eq!((stats.total, stats.processed), (4, 1));
        assert_eq!(oracle.calls(), 1);
    }
}
