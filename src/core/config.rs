//! 内核配置
//!
//! 定义内核的配置结构和加载逻辑。配置文件支持 YAML 与 JSON（按扩展名区分）。
//!
//! ```yaml
//! logging:
//!   level: debug
//! lifecycle:
//!   listener_max_in_flight: 64
//!   listener_timeout_ms: 5000
//! components:
//!   - name: db
//!   - name: cache
//!     depends_on: [db]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::component::event::{DispatcherConfig, DEFAULT_LISTENER_TIMEOUT_MS, DEFAULT_MAX_IN_FLIGHT};
use crate::component::metadata::ComponentInfo;
use crate::utils::{CoreError, Result};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 生命周期配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// 同时运行的监听器任务上限，超出时丢弃通知
    #[serde(default = "default_max_in_flight")]
    pub listener_max_in_flight: usize,

    /// 单次监听器通知超时时间（毫秒）
    #[serde(default = "default_listener_timeout_ms")]
    pub listener_timeout_ms: u64,

    /// 是否在组件之间检查上下文取消
    #[serde(default)]
    pub check_cancellation: bool,
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_listener_timeout_ms() -> u64 {
    DEFAULT_LISTENER_TIMEOUT_MS
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            listener_max_in_flight: default_max_in_flight(),
            listener_timeout_ms: default_listener_timeout_ms(),
            check_cancellation: false,
        }
    }
}

impl LifecycleConfig {
    /// 转换为事件分发器配置
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_in_flight: self.listener_max_in_flight,
            handler_timeout: Duration::from_millis(self.listener_timeout_ms),
        }
    }
}

/// 内核配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 生命周期配置
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// 静态注册的组件描述符
    #[serde(default)]
    pub components: Vec<ComponentInfo>,
}

impl CoreConfig {
    /// 创建配置构建器
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// 从文件加载配置
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CoreError::ConfigLoadFailed(format!("读取 '{}' 失败: {}", path.display(), e))
        })?;

        let mut config: CoreConfig = if path.extension().map_or(false, |e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path);
        config.validate()?;
        Ok(config)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<()> {
        if self.lifecycle.listener_max_in_flight == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "lifecycle.listener_max_in_flight".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.lifecycle.listener_timeout_ms == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "lifecycle.listener_timeout_ms".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if let Some(index) = self.components.iter().position(|c| c.name.trim().is_empty()) {
            return Err(CoreError::InvalidConfigValue {
                key: format!("components[{}].name", index),
                reason: "组件名不能为空".to_string(),
            });
        }
        Ok(())
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置监听器任务上限
    pub fn listener_max_in_flight(mut self, max: usize) -> Self {
        self.config.lifecycle.listener_max_in_flight = max;
        self
    }

    /// 设置监听器超时时间
    pub fn listener_timeout(mut self, timeout: Duration) -> Self {
        self.config.lifecycle.listener_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 启用组件间取消检查
    pub fn check_cancellation(mut self) -> Self {
        self.config.lifecycle.check_cancellation = true;
        self
    }

    /// 添加组件描述符
    pub fn component(mut self, component: ComponentInfo) -> Self {
        self.config.components.push(component);
        self
    }

    /// 构建配置
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
