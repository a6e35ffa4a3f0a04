//! Tests for recursive tile image discovery

#[cfg(test)]
mod tests {
    use crate::write_png;
    use photomosaic::MosaicError;
    use photomosaic::io::cancel::CancelToken;
    use photomosaic::io::directory::{DirectoryScanner, WalkdirScanner};
    use std::path::PathBuf;

    // Tests nested supported files are found and others ignored
    // Verified by disabling recursion
    #[test]
    fn test_scan_recursive_filtered() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("Create nested dir");
        let top = write_png(dir.path(), "top.png", [1, 2, 3]);
        let deep = write_png(&nested, "DEEP.PNG", [4, 5, 6]);
        std::fs::write(dir.path().join("readme.txt"), b"text").expect("Write file");
        std::fs::create_dir(dir.path().join("folder.png")).expect("Create decoy dir");

        let cancel = CancelToken::new();
        let mut found: Vec<PathBuf> = WalkdirScanner
            .scan(dir.path(), &cancel)
            .collect::<photomosaic::Result<_>>()
            .expect("Scan succeeds");
        found.sort();

        let mut expected = vec![top, deep];
        expected.sort();
        assert_eq!(found, expected);
    }

    // Tests a missing root fails the root check
    // Verified by reporting success for missing roots
    #[test]
    fn test_check_root_missing() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        let missing = dir.path().join("missing");

        assert!(WalkdirScanner.check_root(dir.path()).is_ok());
        assert!(matches!(
            WalkdirScanner.check_root(&missing),
            Err(MosaicError::FileSystem {
                operation: "scan",
                ..
            })
        ));
    }

    // Tests a cancelled scan yields nothing
    // Verified by ignoring the token
    #[test]
    fn test_scan_cancelled() {
        let dir = tempfile::tempdir().expect("Create temp dir");
        write_png(dir.path(), "one.png", [1, 1, 1]);

        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(WalkdirScanner.scan(dir.path(), &cancel).count(), 0);
    }
}
