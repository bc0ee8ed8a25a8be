//! 日志系统模块
//!
//! 基于 tracing 生态：
//!
//! - 控制台输出（Pretty 或 JSON 格式，异步非阻塞）
//! - 文件输出（按时间轮转）
//! - `RUST_LOG` 环境变量优先于配置中的级别
//!
//! # 示例
//!
//! ```rust,no_run
//! use composer_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoggerConfig::builder()
//!         .level("debug")
//!         .file_output("./logs")
//!         .rotation(RotationStrategy::Hourly)
//!         .build();
//!
//!     let _guard = Logger::init(config)?;
//!     tracing::info!(component = "db", phase = "initialize", "组件初始化完成");
//!     Ok(())
//! }
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::config::LogConfig;
use crate::utils::{CoreError, Result};

/// 日志文件名前缀
pub const DEFAULT_FILE_PREFIX: &str = "composer-core";

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转（单个日志文件）
    Never,
    /// 每分钟轮转（主要用于测试）
    Minutely,
    /// 每小时轮转
    Hourly,
    /// 每天轮转
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Minutely => Rotation::MINUTELY,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略，无法识别时使用每天轮转
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "minutely" | "minute" => RotationStrategy::Minutely,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RotationStrategy::Never => "never",
            RotationStrategy::Minutely => "minutely",
            RotationStrategy::Hourly => "hourly",
            RotationStrategy::Daily => "daily",
        };
        write!(f, "{}", s)
    }
}

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块
    pub show_target: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 额外的过滤指令（EnvFilter 格式，逗号分隔）
    /// 例如："composer_core::component::event=warn"
    pub filter_directives: Option<String>,

    /// 是否启用 ANSI 颜色（仅控制台 Pretty 格式）
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::default()
    }

    /// 从配置文件中的日志段创建
    pub fn from_log_config(log_config: &LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 设置控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 设置日志文件前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    /// 显示目标模块
    pub fn show_target(mut self, enable: bool) -> Self {
        self.config.show_target = enable;
        self
    }

    /// 显示文件名和行号
    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 启用 ANSI 颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard，丢弃时刷新挂起的日志。
#[derive(Default)]
pub struct LogGuard {
    guards: Vec<WorkerGuard>,
}

impl LogGuard {
    /// 是否持有写入器（`try_init` 在重复初始化时返回空守卫）
    pub fn is_active(&self) -> bool {
        !self.guards.is_empty()
    }
}

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志系统
pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// 返回的 `LogGuard` 必须保持存活直到程序退出。
    ///
    /// # 错误
    ///
    /// 日志系统已初始化或过滤指令无效时返回 `CoreError::InitFailed`
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.get().is_some() {
            return Err(CoreError::InitFailed(
                "日志系统已初始化，不能重复初始化".to_string(),
            ));
        }

        let env_filter = Self::create_env_filter(&config)?;
        let mut guard = LogGuard::default();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.console_output {
            let (writer, console_guard) = tracing_appender::non_blocking(io::stdout());
            guard.guards.push(console_guard);
            layers.push(Self::fmt_layer(&config, writer, config.ansi_colors));
        }

        if let Some(ref log_dir) = config.file_output {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                log_dir,
                format!("{}.log", config.file_prefix),
            );
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard.guards.push(file_guard);
            layers.push(Self::fmt_layer(&config, writer, false));
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        let _ = LOGGER_INITIALIZED.set(());
        Ok(guard)
    }

    /// 尝试初始化日志系统，已初始化时返回空守卫
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_default()
    }

    fn fmt_layer(
        config: &LoggerConfig,
        writer: tracing_appender::non_blocking::NonBlocking,
        ansi: bool,
    ) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(config.show_target)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line);

        if config.json_format {
            layer.json().with_ansi(false).boxed()
        } else {
            layer.with_ansi(ansi).boxed()
        }
    }

    fn create_env_filter(config: &LoggerConfig) -> Result<EnvFilter> {
        // RUST_LOG 优先
        let mut filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .map_err(|e| {
                CoreError::InitFailed(format!("无效的日志级别 '{}': {}", config.level, e))
            })?;

        if let Some(ref directives) = config.filter_directives {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive.parse().map_err(|e| {
                    CoreError::InitFailed(format!("无效的过滤指令 '{}': {}", directive, e))
                })?;
                filter = filter.add_directive(parsed);
            }
        }

        Ok(filter)
    }
}

/// 标准日志字段名称
pub mod fields {
    /// 组件名
    pub const COMPONENT: &str = "component";
    /// 生命周期阶段
    pub const PHASE: &str = "phase";
    /// 生命周期状态
    pub const STATUS: &str = "status";
    /// 依赖列表
    pub const DEPENDENCIES: &str = "dependencies";
    /// 事件 ID
    pub const EVENT_ID: &str = "event_id";
    /// 事件类型
    pub const EVENT_TYPE: &str = "event_type";
    /// 错误码
    pub const ERROR_CODE: &str = "error_code";
    /// 错误消息
    pub const ERROR: &str = "error";
    /// 耗时（毫秒）
    pub const DURATION_MS: &str = "duration_ms";
}
