use std::path::{Path, PathBuf};

pub const CACHE_DIR_NAME: &str = "postsearch";
pub const MODELS_DIR_NAME: &str = "models";
pub const MODEL_DIR_ENV: &str = "POSTSEARCH_MODEL_DIR";

/// Resolve where model assets live.
///
/// Order: `POSTSEARCH_MODEL_DIR`, a `models/` directory found walking up from the
/// executable, then from the working directory, then the user cache
/// (`$XDG_CACHE_HOME/postsearch/models` or `~/.cache/postsearch/models`).
#[must_use]
pub fn model_dir() -> PathBuf {
    if let Ok(path) = std::env::var(MODEL_DIR_ENV) {
        return PathBuf::from(path);
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    for start in [exe_dir, std::env::current_dir().ok()].into_iter().flatten() {
        if let Some(found) = find_models_dir_upwards(&start) {
            return found;
        }
    }

    let cache_base = std::env::var("XDG_CACHE_HOME").map_or_else(
        |_| {
            std::env::var("HOME")
                .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    cache_base.join(CACHE_DIR_NAME).join(MODELS_DIR_NAME)
}

fn find_models_dir_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(MODELS_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_models_dir_in_ancestor() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("models")).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_models_dir_upwards(&nested),
            Some(tmp.path().join("models"))
        );
    }
}
