//! Tests for candidate seed derivation

#[cfg(test)]
mod tests {
    use seamweave::algorithm::seed::{SeedMode, pick_seed};
    use seamweave::io::configuration::SEED_MASK;

    // Tests fixed seeds offset the base by the variant
    // Verified by ignoring the variant
    #[test]
    fn test_fixed_mode() {
        assert_eq!(pick_seed(SeedMode::Fixed, 42, 3, 9, 0), 42);
        assert_eq!(pick_seed(SeedMode::Fixed, 42, 3, 9, 2), 44);
    }

    // Tests tile hash seeds are deterministic and coordinate dependent
    // Verified by hashing without the coordinate
    #[test]
    fn test_tile_hash_mode() {
        let a = pick_seed(SeedMode::TileHash, 42, 3, 9, 1);
        assert_eq!(a, pick_seed(SeedMode::TileHash, 42, 3, 9, 1));
        assert_ne!(a, pick_seed(SeedMode::TileHash, 42, 4, 9, 1));
        assert_ne!(a, pick_seed(SeedMode::TileHash, 42, 3, 9, 2));
        assert!(a <= SEED_MASK);
    }

    // Tests random seeds stay within the mask
    // Verified by removing the mask
    #[test]
    fn test_random_mode_masked() {
        for variant in 0..16 {
            assert!(pick_seed(SeedMode::Random, 0, 0, 0, variant) <= SEED_MASK);
        }
    }

    // Tests display names match the command-line values
    // Verified by printing debug names
    #[test]
    fn test_display_names() {
        assert_eq!(SeedMode::TileHash.to_string(), "tile_hash");
        assert_eq!(SeedMode::Fixed.to_string(), "fixed");
        assert_eq!(SeedMode::default(), SeedMode::TileHash);
    }
}
