//! 配置管理
//!
//! 支持配置文件与环境变量 (HQMS_ 前缀) 两级覆盖

use ::config::{Config, Environment, File};
use hqms_core::{HqmsError, Result};
use serde::{Deserialize, Serialize};

/// 排队系统完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HqmsConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 排队配置
    pub queue: QueueConfig,
    /// 存储配置
    pub storage: StorageConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 排队配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 候诊时间刷新间隔（秒）
    pub refresh_interval_secs: u64,
    /// 播报超时（秒）
    pub announce_timeout_secs: u64,
    /// 最近叫号历史容量
    pub history_capacity: usize,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 快照文件路径
    pub snapshot_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            announce_timeout_secs: 10,
            history_capacity: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "./data/queue_entries.json".to_string(),
        }
    }
}

impl Default for HqmsConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            queue: QueueConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl HqmsConfig {
    /// 加载配置：默认值 <- 配置文件 <- 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(Environment::with_prefix("HQMS").separator("__"));

        let config = builder
            .build()
            .map_err(|e| HqmsError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| HqmsError::Config(e.to_string()))
    }

    /// 配置合法性检查
    pub fn validate(&self) -> Result<()> {
        if self.queue.refresh_interval_secs == 0 {
            return Err(HqmsError::Config(
                "queue.refresh_interval_secs must be positive".to_string(),
            ));
        }
        if self.queue.announce_timeout_secs == 0 {
            return Err(HqmsError::Config(
                "queue.announce_timeout_secs must be positive".to_string(),
            ));
        }
        if self.queue.history_capacity == 0 {
            return Err(HqmsError::Config(
                "queue.history_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HqmsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.refresh_interval_secs, 60);
        assert_eq!(config.queue.history_capacity, 5);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = HqmsConfig::load(None).unwrap();
        assert_eq!(config.queue.announce_timeout_secs, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hqms.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[queue]\nrefresh_interval_secs = 30\n",
        )
        .unwrap();

        let config = HqmsConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.queue.refresh_interval_secs, 30);
        // 未覆盖的键保持默认
        assert_eq!(config.queue.history_capacity, 5);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = HqmsConfig::default();
        config.queue.refresh_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
