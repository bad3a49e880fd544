//! Key → path derivation.

use std::path::{Path, PathBuf};

use crate::key::ResourceKey;

pub(crate) const ENTRY_FILE: &str = "entry.json";

/// Directory name used for classes without a sub-id.
pub(crate) const NO_ID_DIR: &str = "_";

pub(crate) fn entry_dir(root: &Path, key: &ResourceKey) -> PathBuf {
    root.join(key.class().as_str())
        .join(key.id().unwrap_or(NO_ID_DIR))
}

pub(crate) fn entry_path(root: &Path, key: &ResourceKey) -> PathBuf {
    entry_dir(root, key).join(ENTRY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_paths() {
        let root = Path::new("/var/cache/courtside");
        assert_eq!(
            entry_path(root, &ResourceKey::standings()),
            Path::new("/var/cache/courtside/standings/_/entry.json")
        );
        assert_eq!(
            entry_path(root, &ResourceKey::player_stats(2544).unwrap()),
            Path::new("/var/cache/courtside/player-stats/2544/entry.json")
        );
    }
}
