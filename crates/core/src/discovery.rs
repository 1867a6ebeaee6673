use crate::models::{is_url_like, DocumentType};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively lists files under `folder` whose extension the loader accepts.
pub fn discover_sources(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DocumentType::from_extension(ext).is_some());

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Replaces directory inputs with the supported files they contain. URLs and
/// plain file paths pass through unchanged.
pub fn expand_inputs<I, S>(inputs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut expanded = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        if !is_url_like(input) && path.is_dir() {
            expanded.extend(
                discover_sources(path)
                    .into_iter()
                    .map(|file| file.to_string_lossy().to_string()),
            );
        } else {
            expanded.push(input.to_string());
        }
    }
    expanded
}
