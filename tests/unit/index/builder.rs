//! Tests for concurrent directory indexing, per-item failures and run phases

#[cfg(test)]
mod tests {
    use crate::{MemorySource, solid, write_png};
    use photomosaic::MosaicError;
    use photomosaic::color::Color;
    use photomosaic::index::builder::{BuildPhase, IndexBuilder, IndexedImage};
    use photomosaic::index::color_index::ColorIndex;
    use photomosaic::io::cancel::CancelToken;
    use photomosaic::io::configuration::MosaicConfig;
    use photomosaic::io::directory::{DirectoryScanner, PathStream};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    struct FixedScanner {
        paths: Vec<PathBuf>,
    }

    impl DirectoryScanner for FixedScanner {
        fn check_root(&self, _root: &Path) -> photomosaic::Result<()> {
            Ok(())
        }

        fn scan<'a>(&'a self, _root: &'a Path, cancel: &'a CancelToken) -> PathStream<'a> {
            Box::new(
                self.paths
                    .iter()
                    .take_while(move |_| !cancel.is_cancelled())
                    .cloned()
                    .map(Ok),
            )
        }
    }

    fn config() -> MosaicConfig {
        MosaicConfig {
            workers: 2,
            ..MosaicConfig::default()
        }
    }

    // Tests every decodable image lands in the index under its color
    // Verified by dropping records in the merge loop
    #[test]
    fn test_add_path_indexes_directory() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        let red = write_png(dir.path(), "red.png", [255, 0, 0]);
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).expect("Create nested dir");
        let blue = write_png(&nested, "blue.png", [0, 0, 255]);

        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(config());
        let summary = builder
            .add_path(&mut index, dir.path())
            .expect("Indexing succeeds");

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(builder.phase(), BuildPhase::Done);
        assert_eq!(index.paths(Color::new(0xFF0000)), Some(&[red][..]));
        assert_eq!(index.paths(Color::new(0x0000FF)), Some(&[blue][..]));
    }

    // Tests undecodable files are counted and reported but not fatal
    // Verified by propagating the decode error out of the run
    #[test]
    fn test_add_path_skips_corrupt_images() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        write_png(dir.path(), "green.png", [0, 255, 0]);
        std::fs::write(dir.path().join("broken.png"), b"not an image").expect("Write file");
        std::fs::write(dir.path().join("notes.txt"), b"ignored").expect("Write file");

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(config()).on_status(move |record: &IndexedImage| {
            if let Ok(mut seen) = sink.lock() {
                seen.push((record.path.clone(), record.result.is_ok()));
            }
        });

        let summary = builder
            .add_path(&mut index, dir.path())
            .expect("One image is enough");

        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(index.len(), 1);

        let seen = records.lock().expect("Sink lock");
        assert_eq!(seen.len(), 2);
        assert!(
            seen.iter()
                .any(|(path, ok)| path.ends_with("broken.png") && !ok)
        );
    }

    // Tests an empty directory is fatal rather than an empty success
    // Verified by returning the empty summary
    #[test]
    fn test_add_path_empty_directory() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(config());

        let result = builder.add_path(&mut index, dir.path());

        assert!(matches!(result, Err(MosaicError::NoImagesFound { .. })));
        assert_eq!(builder.phase(), BuildPhase::Failed);
        assert!(index.is_empty());
    }

    // Tests a missing root is a fatal file system error
    // Verified by skipping the root check
    #[test]
    fn test_add_path_missing_root() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        let missing = dir.path().join("missing");
        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(config());

        let result = builder.add_path(&mut index, &missing);

        assert!(matches!(
            result,
            Err(MosaicError::FileSystem { ref path, .. }) if *path == missing
        ));
        assert_eq!(builder.phase(), BuildPhase::Failed);
    }

    // Tests repeated runs accumulate into the same index
    // Verified by clearing the index at the start of each run
    #[test]
    fn test_add_path_accumulates() {
        let source = MemorySource::default()
            .with("a/red.png", solid(4, 4, [255, 0, 0, 255]))
            .with("b/red.png", solid(4, 4, [255, 0, 0, 255]))
            .with("b/white.png", solid(4, 4, [255, 255, 255, 255]));

        let mut index = ColorIndex::new();
        IndexBuilder::new(config())
            .with_source(source)
            .with_scanner(FixedScanner {
                paths: vec![PathBuf::from("a/red.png")],
            })
            .add_path(&mut index, Path::new("a"))
            .expect("First run");

        let source = MemorySource::default()
            .with("b/red.png", solid(4, 4, [255, 0, 0, 255]))
            .with("b/white.png", solid(4, 4, [255, 255, 255, 255]));
        IndexBuilder::new(config())
            .with_source(source)
            .with_scanner(FixedScanner {
                paths: vec![PathBuf::from("b/red.png"), PathBuf::from("b/white.png")],
            })
            .add_path(&mut index, Path::new("b"))
            .expect("Second run");

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.paths(Color::new(0xFF0000)).map(<[PathBuf]>::len),
            Some(2)
        );
    }

    // Tests tile images are normalized to the tile size before measuring
    // Verified by measuring the original image
    #[test]
    fn test_resize_tiles_before_measuring() {
        // Center crop of a wide image keeps only the middle blue band
        let mut wide = image::RgbaImage::from_pixel(30, 10, image::Rgba([255, 0, 0, 255]));
        for x in 10..20 {
            for y in 0..10 {
                wide.put_pixel(x, y, image::Rgba([0, 0, 255, 255]));
            }
        }
        let source =
            MemorySource::default().with("wide.png", image::DynamicImage::ImageRgba8(wide));

        let mut index = ColorIndex::new();
        IndexBuilder::new(MosaicConfig {
            resize_tiles: true,
            ..config()
        })
        .with_source(source)
        .with_scanner(FixedScanner {
            paths: vec![PathBuf::from("wide.png")],
        })
        .add_path(&mut index, Path::new("."))
        .expect("Indexing succeeds");

        let (color, _) = index
            .find_nearest(Color::new(0x0000FF))
            .expect("One color indexed");
        assert_eq!(color.channels()[0], 0);
    }

    // Tests a cancelled run stops before indexing anything
    // Verified by ignoring the token in the scanner
    #[test]
    fn test_cancelled_run() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let source = MemorySource::default().with("red.png", solid(4, 4, [255, 0, 0, 255]));

        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(config())
            .with_cancel(cancel)
            .with_source(source)
            .with_scanner(FixedScanner {
                paths: vec![PathBuf::from("red.png")],
            });

        let result = builder.add_path(&mut index, Path::new("."));
        assert!(matches!(result, Err(MosaicError::NoImagesFound { .. })));
    }

    // Tests invalid configuration is rejected before scanning
    // Verified by validating after the walk
    #[test]
    fn test_invalid_config() {
        let mut index = ColorIndex::new();
        let mut builder = IndexBuilder::new(MosaicConfig {
            workers: 0,
            ..config()
        });
        assert_eq!(builder.phase(), BuildPhase::Idle);

        let result = builder.add_path(&mut index, Path::new("."));
        assert!(matches!(
            result,
            Err(MosaicError::InvalidParameter {
                parameter: "workers",
                ..
            })
        ));
    }
}
