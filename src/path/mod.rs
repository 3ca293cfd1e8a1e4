//! Home-directory shorthand for paths typed by the user and paths shown back.

use std::path::{Path, PathBuf};

/// Expands a leading `~` or `~/` against `home`. `~user` forms are left alone.
pub fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix('~') {
        Some("") => home.to_path_buf(),
        Some(rest) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

/// Short name of a directory for the prompt: `~` for `home`, `/` for the
/// root, otherwise the last component.
pub fn display_dir(path: &Path, home: Option<&Path>) -> String {
    if home == Some(path) {
        return "~".to_string();
    }
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}
