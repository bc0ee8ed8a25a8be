//! # Composer Core - 组件组合内核
//!
//! 管理一组相互依赖的组件的生命周期：
//!
//! - **依赖解析**: 基于 Kahn 算法的拓扑排序，同层按组件名字典序稳定排序；
//!   缺失依赖与循环依赖在任何钩子执行之前报告
//! - **生命周期管理**: Initialize → Start → Stop → Shutdown 状态机，
//!   初始化与启动按依赖顺序执行，停止与关闭按依赖逆序执行
//! - **生命周期事件**: 每次状态转换通知监听器，通知异步执行且不阻塞阶段调用
//! - **配置管理**: YAML / JSON 配置文件
//! - **日志系统**: 基于 tracing 的结构化日志
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use composer_core::{ComponentInfo, ComponentRegistry, LifecycleContext, LifecycleManager};
//!
//! #[tokio::main]
//! async fn main() -> composer_core::Result<()> {
//!     let registry = Arc::new(ComponentRegistry::new());
//!     let manager = LifecycleManager::new().with_hooks(registry.clone());
//!
//!     manager.register_component(ComponentInfo::new("db")).await?;
//!     manager
//!         .register_component(ComponentInfo::new("cache").with_dependency("db"))
//!         .await?;
//!
//!     let ctx = LifecycleContext::new();
//!     manager.initialize(&ctx).await?;
//!     manager.start(&ctx).await?;
//!     manager.stop(&ctx).await?;
//!     manager.shutdown(&ctx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `component` - 组件描述符、依赖解析、钩子、事件与生命周期管理器
//! - `core` - 内核配置
//! - `utils` - 错误类型与日志系统

#![warn(rustdoc::missing_crate_level_docs)]

pub mod component;
pub mod core;
pub mod utils;

// 重导出常用类型，方便使用
pub use component::{
    Component, ComponentHooks, ComponentInfo, ComponentRegistry, DependencyGraph,
    DependencyResolver, DispatchStats, EventDispatcher, FnListener, HealthState, HealthStatus,
    LifecycleContext, LifecycleEvent, LifecycleEventType, LifecycleListener, LifecycleManager,
    LifecyclePhase, LifecycleStatus, NoopHooks,
};

pub use core::config::{CoreConfig, CoreConfigBuilder, LifecycleConfig, LogConfig};
pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
pub use utils::{error_code, CoreError, Result};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
