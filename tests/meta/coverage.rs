//! Keeps `tests/unit` mirroring `src` and every test file doing some testing

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use walkdir::WalkDir;

    fn root() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    // Module files below `dir`, relative to it, without crate roots or `mod.rs`
    fn module_files(dir: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.path().strip_prefix(dir).ok().map(Path::to_path_buf))
            .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
            .filter(|path| {
                !matches!(
                    path.file_name().and_then(|name| name.to_str()),
                    Some("mod.rs")
                ) && path != Path::new("lib.rs")
                    && path != Path::new("main.rs")
            })
            .collect()
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path)
            .unwrap_or_else(|e| unreachable!("Failed to read {}: {e}", path.display()))
    }

    // Tests each source module has a unit test file at the same relative path
    // Verified by adding a module under src without a counterpart
    #[test]
    fn test_unit_tests_mirror_src() {
        let src = module_files(&root().join("src"));
        let unit = module_files(&root().join("tests/unit"));

        let untested: Vec<_> = src.difference(&unit).collect();
        let orphaned: Vec<_> = unit.difference(&src).collect();
        assert!(untested.is_empty(), "No unit tests for src/{untested:?}");
        assert!(orphaned.is_empty(), "No src module for tests/unit/{orphaned:?}");
    }

    // Tests the fixture harness wires in every top-level module directory
    // Verified by removing a `mod` line from tests/unit/main.rs
    #[test]
    fn test_unit_harness_declares_every_module() {
        let harness = read(&root().join("tests/unit/main.rs"));

        let modules = fs::read_dir(root().join("src"))
            .expect("Read src directory")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned());
        for module in modules {
            assert!(
                harness.contains(&format!("mod {module};")),
                "tests/unit/main.rs does not declare `mod {module};`"
            );
        }
    }

    // Tests unit files and top-level scenario files all contain tests
    // Verified by leaving an empty test module in place
    #[test]
    fn test_test_files_contain_tests() {
        let unit_dir = root().join("tests/unit");
        let unit = module_files(&unit_dir)
            .into_iter()
            .map(|path| unit_dir.join(path));
        let scenarios = fs::read_dir(root().join("tests"))
            .expect("Read tests directory")
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "rs"));

        let empty: Vec<_> = unit
            .chain(scenarios)
            .filter(|path| !read(path).contains("#[test]"))
            .collect();
        assert!(empty.is_empty(), "Test files without tests: {empty:?}");
    }
}
