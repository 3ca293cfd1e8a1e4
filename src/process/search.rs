use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Finds the executable that `name` refers to.
///
/// Names containing a `/` are taken as paths; anything else is looked up in
/// each directory of `PATH`, first match wins.
pub fn resolve(name: &str) -> Option<PathBuf> {
    resolve_in(name, env::var_os("PATH").as_deref())
}

pub fn resolve_in(name: &str, search_path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }

    env::split_paths(search_path?)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(".").join(name)
            } else {
                dir.join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
