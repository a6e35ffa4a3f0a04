//! Tests for configuration defaults and parameter validation

#[cfg(test)]
mod tests {
    use photomosaic::MosaicError;
    use photomosaic::io::configuration::{
        ColorMode, DEFAULT_INDEX_THRESHOLD, DEFAULT_TILE_SIZE, MosaicConfig, default_workers,
    };

    fn rejected_parameter(config: &MosaicConfig) -> Option<&'static str> {
        match config.validate() {
            Err(MosaicError::InvalidParameter { parameter, .. }) => Some(parameter),
            _ => None,
        }
    }

    // Tests defaults are valid and match the documented values
    // Verified by changing the default tile size
    #[test]
    fn test_default_config() {
        let config = MosaicConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.tile_width, DEFAULT_TILE_SIZE);
        assert_eq!(config.tile_height, 10);
        assert!((config.index_threshold - DEFAULT_INDEX_THRESHOLD).abs() < f64::EPSILON);
        assert_eq!(config.color_mode, ColorMode::Primary);
        assert!(!config.blend);
        assert!(!config.resize_tiles);
        assert_eq!(config.workers, default_workers());
    }

    // Tests at least one worker is always available by default
    // Verified by returning the raw CPU count of zero
    #[test]
    fn test_default_workers_positive() {
        assert!(default_workers() >= 1);
    }

    // Tests zero tile dimensions are rejected
    // Verified by skipping the tile height check
    #[test]
    fn test_zero_tile_size() {
        let width = MosaicConfig {
            tile_width: 0,
            ..MosaicConfig::default()
        };
        let height = MosaicConfig {
            tile_height: 0,
            ..MosaicConfig::default()
        };

        assert_eq!(rejected_parameter(&width), Some("tile_width"));
        assert_eq!(rejected_parameter(&height), Some("tile_height"));
    }

    // Tests zero workers are rejected
    // Verified by letting the pool pick a default size
    #[test]
    fn test_zero_workers() {
        let config = MosaicConfig {
            workers: 0,
            ..MosaicConfig::default()
        };
        assert_eq!(rejected_parameter(&config), Some("workers"));
    }

    // Tests the scale factor must be positive and finite
    // Verified by only checking for negative values
    #[test]
    fn test_invalid_scale() {
        for scale in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let config = MosaicConfig {
                scale,
                ..MosaicConfig::default()
            };
            assert_eq!(rejected_parameter(&config), Some("scale"), "scale {scale}");
        }
    }

    // Tests the threshold must lie in [0, 1)
    // Verified by accepting a threshold of 1
    #[test]
    fn test_threshold_range() {
        for threshold in [-0.1, 1.0, 2.0] {
            let config = MosaicConfig {
                index_threshold: threshold,
                ..MosaicConfig::default()
            };
            assert_eq!(rejected_parameter(&config), Some("index_threshold"));
        }

        let zero = MosaicConfig {
            index_threshold: 0.0,
            ..MosaicConfig::default()
        };
        assert!(zero.validate().is_ok());
    }
}
