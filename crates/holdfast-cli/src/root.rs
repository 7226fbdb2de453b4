use std::path::{Path, PathBuf};

/// Resolve the holdfast project root.
///
/// Priority:
/// 1. `--root` flag / `HOLDFAST_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `start` (the hook event's cwd) looking for `.holdfast/`
/// 3. Walk upward looking for `.git/`
/// 4. Fall back to the start directory
pub fn resolve_root(explicit: Option<&Path>, start: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = match start {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    // Walk upward looking for .holdfast/
    let mut dir = cwd.clone();
    loop {
        if dir.join(".holdfast").is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    // Walk upward looking for .git/
    let mut dir = cwd.clone();
    loop {
        if dir.join(".git").is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    cwd
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()), None);
        assert_eq!(result, dir.path());
    }

    #[test]
    fn walks_up_to_holdfast_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".holdfast")).unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        let result = resolve_root(None, Some(&subdir));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn falls_back_to_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let subdir = dir.path().join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let result = resolve_root(None, Some(&subdir));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn unmarked_tree_returns_start() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(None, Some(dir.path()));
        assert_eq!(result, dir.path());
    }
}
