use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use fleet_core::{FileMetadata, FleetError, FleetResult};
use glob::Pattern;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::paths::NodeRoot;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// 流式计算文件的SHA-256，每次读取64 KiB
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 列举选项
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub pattern: Option<String>,
    pub include_hash: bool,
}

/// 列举 `target` 本身及其子项（或整个子树），按相对路径排序
///
/// 模式使用shell通配符，匹配相对路径或文件名之一即可。
pub fn list_entries(
    root: &NodeRoot,
    target: &Path,
    options: &ListOptions,
) -> FleetResult<Vec<FileMetadata>> {
    if !target.exists() {
        return Err(FleetError::NotFound {
            path: root.relative(target),
        });
    }

    let pattern = options
        .pattern
        .as_deref()
        .map(Pattern::new)
        .transpose()
        .map_err(|e| FleetError::validation(format!("无效的通配符模式: {e}")))?;

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut entries = Vec::new();

    for entry in WalkDir::new(target).min_depth(0).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("跳过无法访问的条目: {}", e);
                continue;
            }
        };

        let relative_path = root.relative(entry.path());
        if let Some(pattern) = &pattern {
            let name = entry.file_name().to_string_lossy();
            if !(pattern.matches(&relative_path) || pattern.matches(&name)) {
                continue;
            }
        }

        let metadata = entry.metadata().map_err(|e| {
            FleetError::Io(io::Error::other(format!(
                "读取元数据失败 {}: {e}",
                entry.path().display()
            )))
        })?;
        let is_dir = metadata.is_dir();
        let hash = if options.include_hash && !is_dir {
            Some(hash_file(entry.path())?)
        } else {
            None
        };

        entries.push(FileMetadata {
            path: entry.path().to_string_lossy().into_owned(),
            relative_path,
            is_dir,
            size: (!is_dir).then(|| metadata.len()),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            hash,
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}
