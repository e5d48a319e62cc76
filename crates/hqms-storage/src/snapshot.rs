//! JSON快照持久化
//!
//! 把全部排队条目序列化为单个JSON数组文件，启动时读回

use hqms_core::{HqmsError, QueueEntry, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 快照存储
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// 创建快照存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 快照文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存条目快照
    ///
    /// 先写临时文件再重命名，避免崩溃留下半截文件。
    pub fn save(&self, entries: &[QueueEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            HqmsError::Storage(format!(
                "Failed to move snapshot into place at {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!("Saved {} queue entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// 读取条目快照；文件不存在视为空队列
    pub fn load(&self) -> Result<Vec<QueueEntry>> {
        if !self.path.exists() {
            debug!("No snapshot at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path)?;
        let entries: Vec<QueueEntry> = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} queue entries from {}",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }
}
