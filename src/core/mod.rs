//! 核心模块
//!
//! 包含内核配置的定义与加载。

pub mod config;

pub use config::{CoreConfig, CoreConfigBuilder, LifecycleConfig, LogConfig};
