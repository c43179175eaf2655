/* 📖 # Why run the same scenarios against both PAL implementations?

The engine is tested almost exclusively against MockPal. These tests pin down
that MockPal answers directory listings, reads and missing paths the same way
RealPal does on disk, so engine tests stay meaningful for production.
*/

#[cfg(test)]
mod pal_consistency_tests {
    use crate::pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
    use tempfile::TempDir;

    const TREE: &[(&str, &str)] = &[
        ("_docs/v1/en/intro.md", "# Intro"),
        ("_docs/v1/en/setup.md", "# Setup"),
        ("_docs/v1/es/intro.md", "# Introducción"),
        ("_docs/v2/en/intro.md", "# Intro v2"),
        ("_docs/README.txt", "versions live here"),
    ];

    fn mock_pal() -> PalHandle {
        let mock = MockPal::new();
        for (path, content) in TREE {
            mock.add_file(*path, *content);
        }
        PalHandle::new(mock)
    }

    fn real_pal() -> (TempDir, PalHandle) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        for (path, content) in TREE {
            let full = temp_dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let pal = PalHandle::new(RealPal::new(temp_dir.path().to_path_buf()));
        (temp_dir, pal)
    }

    fn listing(pal: &PalHandle, dir: &str) -> Vec<(String, bool)> {
        pal.list_directory(&FilePath::from(dir))
            .unwrap()
            .into_iter()
            .map(|entry| (entry.path.to_string(), entry.is_dir))
            .collect()
    }

    #[test]
    fn test_listings_agree() {
        let mock = mock_pal();
        let (_temp_dir, real) = real_pal();

        for dir in ["_docs", "_docs/v1", "_docs/v1/en", "_docs/v2/en"] {
            assert_eq!(listing(&mock, dir), listing(&real, dir), "listing of {}", dir);
        }
    }

    #[test]
    fn test_reads_agree() {
        let mock = mock_pal();
        let (_temp_dir, real) = real_pal();
        let path = FilePath::from("_docs/v1/es/intro.md");

        assert_eq!(
            mock.read_file_to_string(&path).unwrap(),
            real.read_file_to_string(&path).unwrap()
        );
    }

    #[test]
    fn test_missing_paths_are_not_found_in_both() {
        let mock = mock_pal();
        let (_temp_dir, real) = real_pal();

        for pal in [&mock, &real] {
            let missing_file = FilePath::from("_docs/v1/en/missing.md");
            assert!(pal.read_file_to_string(&missing_file).unwrap_err().is_not_found());
            assert!(
                pal.list_directory(&FilePath::from("_docs/v9"))
                    .unwrap_err()
                    .is_not_found()
            );
            assert!(!pal.file_exists(&missing_file).unwrap());
        }
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mock = MockPal::new();
        mock.add_file("_docs/v1/en/bad.md", vec![0xFF, 0xFE]);

        let err = mock
            .read_file_to_string(&FilePath::from("_docs/v1/en/bad.md"))
            .unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
        assert!(!err.is_not_found());
    }
}
