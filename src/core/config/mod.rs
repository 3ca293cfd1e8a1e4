use std::fs;
use std::path::{Path, PathBuf};

mod aliases;

pub use aliases::AliasManager;

use crate::error::ShellError;

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub home: PathBuf,
    pub rc_path: PathBuf,
    pub history_path: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self, ShellError> {
        let home = dirs::home_dir().ok_or(ShellError::HomeDirNotFound)?;
        Ok(Self::from_home(&home))
    }

    pub fn from_home(home: &Path) -> Self {
        ConfigPaths {
            home: home.to_path_buf(),
            rc_path: home.join(".strandrc"),
            history_path: home.join(".strand_history"),
        }
    }
}

/// Command lines of a startup file, without blank lines and comments.
/// A missing file has no lines.
pub fn read_rc_lines(path: &Path) -> Result<Vec<String>, ShellError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_from_home() {
        let paths = ConfigPaths::from_home(Path::new("/home/testuser"));

        assert_eq!(paths.rc_path, PathBuf::from("/home/testuser/.strandrc"));
        assert_eq!(
            paths.history_path,
            PathBuf::from("/home/testuser/.strand_history")
        );
    }

    #[test]
    fn test_read_rc_lines() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".strandrc");
        fs::write(
            &rc,
            "# aliases\nalias gs='git status'\n\n   export EDITOR=vi  \n",
        )
        .unwrap();

        assert_eq!(
            read_rc_lines(&rc).unwrap(),
            vec!["alias gs='git status'", "export EDITOR=vi"]
        );
        assert!(read_rc_lines(&dir.path().join("missing")).unwrap().is_empty());
    }
}
