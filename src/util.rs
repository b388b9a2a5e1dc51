use std::iter::repeat;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated document ids.
pub const AUTO_ID_LENGTH: usize = 20;

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

/// Generates a random alphanumeric document id.
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_ids_are_alphanumeric() {
        let id = auto_id();
        assert_eq!(id.len(), AUTO_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, auto_id());
    }

    #[test]
    fn first_subpath_matches_in_order() {
        let found = find_first_subpath("/config", &["a.yml", "b.yml"], |p| {
            p.ends_with("b.yml")
        });
        assert_eq!(found, Some(PathBuf::from("/config/b.yml")));

        let none = find_first_subpath("/config", &["a.yml"], |_| false);
        assert_eq!(none, None);
    }
}
