use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use fleet_core::{FleetError, FleetResult};

/// 节点根目录
///
/// 所有请求路径都在这里解析，解析结果必须位于根目录之内。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRoot {
    root: PathBuf,
}

impl NodeRoot {
    /// 根目录不存在时创建
    pub fn new(root: impl AsRef<Path>) -> FleetResult<Self> {
        let root = root.as_ref();
        if !root.exists() {
            std::fs::create_dir_all(root)?;
            tracing::info!("创建节点根目录: {}", root.display());
        }
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(FleetError::config(format!(
                "节点根目录不是目录: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// 把请求路径解析为根目录下的绝对路径
    ///
    /// 相对路径相对于根目录；`..` 先按字面折叠，已存在的部分再解析符号链接，
    /// 因此指向根目录外的链接同样会被拒绝。
    pub fn resolve(&self, requested: &str) -> FleetResult<PathBuf> {
        let requested_path = Path::new(requested);
        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.root.join(requested_path)
        };

        let resolved = canonicalize_existing(&normalize(&joined))?;
        if !resolved.starts_with(&self.root) {
            tracing::warn!("拒绝越出根目录的路径: {}", requested);
            return Err(FleetError::PathEscapesRoot {
                path: requested.to_string(),
            });
        }
        Ok(resolved)
    }

    /// 相对于根目录的路径，`/` 分隔，根目录本身为 `.`
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 解析最长的已存在前缀，剩余部分原样拼接
fn canonicalize_existing(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();

    while !existing.exists() {
        match existing.file_name() {
            Some(name) => {
                missing.push(name.to_os_string());
                existing.pop();
            }
            None => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for part in missing.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::ErrorKind;

    #[test]
    fn test_resolve_within_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = NodeRoot::new(dir.path()).unwrap();

        let resolved = root.resolve("a/b/../c.txt").unwrap();
        assert_eq!(resolved, root.path().join("a/c.txt"));
        assert_eq!(root.relative(&resolved), "a/c.txt");
        assert_eq!(root.relative(root.path()), ".");
    }

    #[test]
    fn test_parent_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = NodeRoot::new(dir.path().join("root")).unwrap();

        let err = root.resolve("../outside.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscapesRoot);

        let err = root.resolve("/etc/passwd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscapesRoot);
    }

    #[test]
    fn test_absolute_path_inside_root_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let root = NodeRoot::new(dir.path()).unwrap();
        let inside = root.path().join("data.txt");
        assert_eq!(root.resolve(&inside.to_string_lossy()).unwrap(), inside);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        let root = NodeRoot::new(dir.path().join("root")).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();

        let err = root.resolve("link/secret.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscapesRoot);
    }
}
