// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::{Path, PathBuf};

use path_clean::clean;

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

/// Walk up from `path` looking for `filename`
pub fn find_in_parent(path: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = path.to_path_buf();

    loop {
        let file_path = current.join(filename);
        if file_path.exists() {
            return Some(file_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Work out which configuration file to read.
///
/// An explicit file wins and is resolved against `cwd` when relative. Otherwise the nearest
/// `default_filename` in `cwd` or one of its parents is used. `None` means run on defaults.
pub fn resolve_config_path(
    find_in_parent: FindInParent,
    cwd: &Path,
    default_filename: &str,
    cli_file: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(cli_file) = cli_file {
        if cli_file.is_absolute() {
            return Some(cli_file.to_path_buf());
        }
        return Some(clean(cwd.join(cli_file)));
    }

    find_in_parent(cwd, default_filename)
}

#[cfg(test)]
mod tests {
    use super::resolve_config_path;
    use std::path::{Path, PathBuf};

    fn not_found(_: &Path, _: &str) -> Option<PathBuf> {
        None
    }

    fn found(_: &Path, _: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/fl/hefl.config.yaml"))
    }

    #[test]
    fn explicit_file_wins() {
        let path = resolve_config_path(
            found,
            Path::new("/fl/round"),
            "hefl.config.yaml",
            Some(Path::new("/etc/hefl/conf.yaml")),
        );
        assert_eq!(path, Some(PathBuf::from("/etc/hefl/conf.yaml")));

        let path = resolve_config_path(
            found,
            Path::new("/fl/round"),
            "hefl.config.yaml",
            Some(Path::new("../conf.yaml")),
        );
        assert_eq!(path, Some(PathBuf::from("/fl/conf.yaml")));
    }

    #[test]
    fn searches_parents_then_falls_back_to_defaults() {
        let path = resolve_config_path(found, Path::new("/fl/round"), "hefl.config.yaml", None);
        assert_eq!(path, Some(PathBuf::from("/fl/hefl.config.yaml")));

        let path =
            resolve_config_path(not_found, Path::new("/fl/round"), "hefl.config.yaml", None);
        assert_eq!(path, None);
    }
}
