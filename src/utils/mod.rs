//! Utility functions and helpers for retrotype.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Returns an iterator over all Python files under `path`, sorted by file
/// name within each directory.
pub fn find_python_files<P: AsRef<Path>>(path: P) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.is_file() && path.extension().map_or(false, |ext| ext == "py")
        })
        .map(|entry| entry.path().to_path_buf())
}

/// Expands command-line inputs: directories become the Python files below
/// them, everything else is passed through unchanged so missing paths still
/// reach the batch driver.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    inputs
        .iter()
        .flat_map(|input| -> Box<dyn Iterator<Item = PathBuf>> {
            if input.is_dir() {
                Box::new(find_python_files(input))
            } else {
                Box::new(std::iter::once(input.clone()))
            }
        })
        .collect()
}

/// Report label of a source unit: its file name, e.g. `tasks.py`.
pub fn module_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_find_python_files() {
        let temp_dir = tempdir().unwrap();
        let dir_path = temp_dir.path();

        File::create(dir_path.join("b.py")).unwrap();
        File::create(dir_path.join("a.py")).unwrap();
        File::create(dir_path.join("not_python.txt")).unwrap();
        fs::create_dir(dir_path.join("pkg")).unwrap();
        File::create(dir_path.join("pkg").join("c.py")).unwrap();

        let names: Vec<_> = find_python_files(dir_path).map(|p| module_name(&p)).collect();
        assert_eq!(names, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn test_expand_inputs_keeps_missing_paths() {
        let temp_dir = tempdir().unwrap();
        File::create(temp_dir.path().join("x.py")).unwrap();
        let missing = temp_dir.path().join("missing.py");

        let expanded = expand_inputs(&[temp_dir.path().to_path_buf(), missing.clone()]);
        assert_eq!(expanded, vec![temp_dir.path().join("x.py"), missing]);
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name(Path::new("/path/to/module.py")), "module.py");
        assert_eq!(module_name(Path::new("module.py")), "module.py");
    }
}
