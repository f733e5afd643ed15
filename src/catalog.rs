//! Test catalog: derive test identifiers from the source files in a directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use difftest_core::TestId;

use crate::cli::test_interfaces::HarnessError;

/// List the tests in `dir`: one per regular file named `<stem>.<extension>`.
///
/// The directory is not searched recursively. Identifiers are returned sorted so runs are
/// reproducible regardless of the order the filesystem lists entries in.
///
/// ## Errors
///
/// - `DirectoryNotFound` if `dir` does not exist
/// - `DirectoryUnreadable` if `dir` cannot be listed (including when it is not a directory)
/// - `DuplicateTest` if two file names map to the same identifier, which happens when names that are not
///   valid UTF-8 decode to the same text
#[tracing::instrument(skip_all, fields(dir = %dir.display(), extension = extension))]
pub fn discover_tests(dir: &Path, extension: &str) -> Result<Vec<TestId>, HarnessError> {
    let unreadable = |source: io::Error| HarnessError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HarnessError::DirectoryNotFound(dir.to_path_buf()));
        }
        Err(e) => return Err(unreadable(e)),
    };

    // identifier -> raw file name it came from
    let mut seen: HashMap<TestId, String> = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(unreadable)?;
        if !entry.path().is_file() {
            continue;
        }
        let raw_name = entry.file_name();
        let name = raw_name.to_string_lossy();
        let Some(id) = TestId::from_file_name(&name, extension) else {
            continue;
        };
        let raw = format!("{:?}", raw_name);
        if let Some(first) = seen.get(&id) {
            let (first, second) = if *first <= raw { (first.clone(), raw) } else { (raw, first.clone()) };
            return Err(HarnessError::DuplicateTest { id, first, second });
        }
        tracing::trace!(test = %id, "discovered test");
        seen.insert(id, raw);
    }

    let mut tests: Vec<TestId> = seen.into_keys().collect();
    tests.sort();
    tracing::debug!(count = tests.len(), "test discovery complete");
    Ok(tests)
}
