//! Locating optional sample products and scratch space for written files.

use std::path::PathBuf;

/// Environment variable naming an extra directory of sample products.
pub const TEST_DATA_ENV: &str = "TEST_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Directories searched for sample products, in order.
///
/// `$TEST_DATA_DIR` comes first when set, then the reader and container
/// `testdata/` directories and the workspace-level `testdata/`.
pub fn testdata_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    std::env::var_os(TEST_DATA_ENV)
        .map(PathBuf::from)
        .into_iter()
        .chain([
            root.join("crates/wind-reader/testdata"),
            root.join("crates/wind-container/testdata"),
            root.join("testdata"),
        ])
        .collect()
}

/// First existing file called `name` in [`testdata_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    testdata_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory for files written by a test, removed on drop.
///
/// The prefix shows up in the directory name, which helps when a failing
/// test leaves output behind under a debugger.
pub fn scratch_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create scratch directory")
}
