//! Path validation for the file tools.
//!
//! Blocks forbidden locations (e.g., ~/.ssh, /etc/shadow) and, when allowed
//! roots are configured, confines access to them. Paths are resolved through
//! symlinks before comparison; paths that do not exist yet are resolved via
//! their nearest existing ancestor.

use std::path::{Component, Path, PathBuf};

use ironjudge_config::ToolsConfig;

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathGuardError {
    #[error("Path '{path}' is outside allowed roots")]
    OutsideAllowedRoots { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Failed to resolve path '{path}': {reason}")]
    ResolveFailed { path: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct PathGuard {
    allowed_roots: Vec<PathBuf>,
    forbidden: Vec<(String, PathBuf)>,
}

impl PathGuard {
    /// A guard that allows everything.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn new(allowed_roots: &[PathBuf], forbidden_paths: &[String]) -> Self {
        Self {
            allowed_roots: allowed_roots
                .iter()
                .map(|root| resolve(&expand_tilde(&root.to_string_lossy())))
                .collect(),
            forbidden: forbidden_paths
                .iter()
                .map(|pattern| (pattern.clone(), resolve(&expand_tilde(pattern))))
                .collect(),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(&config.allowed_roots, &config.forbidden_paths)
    }

    /// Validate `path` and return its resolved form.
    pub fn check(&self, path: &str) -> Result<PathBuf, PathGuardError> {
        let input = expand_tilde(path);
        let absolute = if input.is_absolute() {
            input
        } else {
            std::env::current_dir()
                .map_err(|e| PathGuardError::ResolveFailed {
                    path: path.into(),
                    reason: e.to_string(),
                })?
                .join(input)
        };
        let resolved = resolve(&absolute);

        for (pattern, forbidden) in &self.forbidden {
            if resolved.starts_with(forbidden) {
                return Err(PathGuardError::ForbiddenPath {
                    path: path.into(),
                    pattern: pattern.clone(),
                });
            }
        }

        if !self.allowed_roots.is_empty()
            && !self.allowed_roots.iter().any(|root| resolved.starts_with(root))
        {
            return Err(PathGuardError::OutsideAllowedRoots { path: path.into() });
        }

        Ok(resolved)
    }
}

/// Canonicalize the longest existing prefix and append the rest lexically.
fn resolve(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Remove `.` and fold `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = home_dir()
    {
        return PathBuf::from(path.replacen('~', &home, 1));
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_allows_anything() {
        let guard = PathGuard::permissive();
        assert!(guard.check("/home/user/project/file.txt").is_ok());
        assert!(guard.check("relative/file.txt").is_ok());
    }

    #[test]
    fn forbidden_path_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("secrets");
        std::fs::create_dir(&secret).unwrap();

        let guard = PathGuard::new(&[], &[secret.to_string_lossy().into_owned()]);
        let target = secret.join("key.pem");
        match guard.check(target.to_str().unwrap()) {
            Err(PathGuardError::ForbiddenPath { .. }) => {}
            other => panic!("expected ForbiddenPath, got {other:?}"),
        }
    }

    #[test]
    fn traversal_resolved_before_check() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("work");
        std::fs::create_dir(&root).unwrap();

        let guard = PathGuard::new(&[root.clone()], &[]);
        let inside = root.join("notes.txt");
        assert!(guard.check(inside.to_str().unwrap()).is_ok());

        let escape = root.join("..").join("outside.txt");
        assert!(matches!(
            guard.check(escape.to_str().unwrap()),
            Err(PathGuardError::OutsideAllowedRoots { .. })
        ));
    }

    #[test]
    fn nonexistent_nested_path_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(&[dir.path().to_path_buf()], &[]);
        let deep = dir.path().join("a").join("b").join("c.txt");
        let resolved = guard.check(deep.to_str().unwrap()).unwrap();
        assert!(resolved.ends_with("a/b/c.txt"));
    }

    #[test]
    fn sibling_prefix_is_not_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("app");
        let sibling = dir.path().join("app-secrets");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(&sibling).unwrap();

        let guard = PathGuard::new(&[root], &[]);
        let target = sibling.join("x");
        assert!(guard.check(target.to_str().unwrap()).is_err());
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
