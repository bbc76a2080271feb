use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fleet_core::SyncStrategy;
use walkdir::WalkDir;

/// 复制统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub bytes: u64,
}

/// 把 `source` 复制到 `dest`
///
/// 源是单个文件时直接覆盖目标文件。源是目录时，`Mirror` 先删除整个目标子树，
/// `Append` 在已有内容上覆盖复制。
pub fn copy_tree(source: &Path, dest: &Path, strategy: SyncStrategy) -> io::Result<CopyStats> {
    if source.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = fs::copy(source, dest)?;
        return Ok(CopyStats { files: 1, bytes });
    }

    if strategy == SyncStrategy::Mirror {
        remove_existing(dest)?;
    }
    fs::create_dir_all(dest)?;

    let mut stats = CopyStats::default();
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let dest_file = dest.join(rel);
        if let Some(parent) = dest_file.parent() {
            fs::create_dir_all(parent)?;
        }
        stats.bytes += fs::copy(entry.path(), &dest_file)?;
        stats.files += 1;
    }
    Ok(stats)
}

/// 源和目标是同一路径或互相包含时返回 true
///
/// 目标可能尚不存在，按最近的已存在祖先规范化后再比较。
pub fn paths_overlap(source: &Path, dest: &Path) -> io::Result<bool> {
    let source = fs::canonicalize(source)?;
    let dest = canonical_target(dest)?;
    Ok(dest.starts_with(&source) || source.starts_with(&dest))
}

fn canonical_target(path: &Path) -> io::Result<PathBuf> {
    let mut existing = std::path::absolute(path)?;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    let mut resolved = fs::canonicalize(&existing)?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

fn remove_existing(dest: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dest),
        Ok(_) => fs::remove_file(dest),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_tree(base: &Path) -> std::path::PathBuf {
        let source = base.join("source");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), "hi").unwrap();
        fs::write(source.join("nested/b.txt"), "there").unwrap();
        source
    }

    #[test]
    fn test_mirror_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let dest = dir.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();

        let stats = copy_tree(&source, &dest, SyncStrategy::Mirror).unwrap();
        assert_eq!(stats, CopyStats { files: 2, bytes: 7 });
        assert!(!dest.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(dest.join("nested/b.txt")).unwrap(), "there");
    }

    #[test]
    fn test_append_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let dest = dir.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();
        fs::write(dest.join("a.txt"), "previous").unwrap();

        copy_tree(&source, &dest, SyncStrategy::Append).unwrap();
        assert_eq!(fs::read_to_string(dest.join("stale.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "hi");
    }

    #[test]
    fn test_overlap_detection() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());

        assert!(paths_overlap(&source, &source).unwrap());
        assert!(paths_overlap(&source, &source.join("nested/out")).unwrap());
        assert!(paths_overlap(&source, dir.path()).unwrap());
        assert!(!paths_overlap(&source, &dir.path().join("dest/source")).unwrap());
        assert!(!paths_overlap(&source, &dir.path().join("source-copy")).unwrap());
    }

    #[test]
    fn test_single_file_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path()).join("a.txt");
        let dest = dir.path().join("out/deeper/a.txt");

        let stats = copy_tree(&source, &dest, SyncStrategy::Mirror).unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(fs::read_to_string(dest).unwrap(), "hi");
    }
}
