//! 组件生命周期模块
//!
//! - `metadata` - 组件描述符、生命周期状态与阶段
//! - `dependency` - 依赖图与依赖解析（拓扑排序、循环检测）
//! - `hooks` - 组件能力描述、钩子分发与组件注册表
//! - `event` - 生命周期事件与异步事件分发
//! - `lifecycle` - 生命周期管理器（状态机）

pub mod dependency;
pub mod event;
pub mod hooks;
pub mod lifecycle;
pub mod metadata;

pub use dependency::{DependencyGraph, DependencyResolver};
pub use event::{
    DispatchStats, DispatcherConfig, EventDispatcher, FnListener, LifecycleEvent,
    LifecycleEventType, LifecycleListener, MANAGER_COMPONENT,
};
pub use hooks::{Component, ComponentHooks, ComponentRegistry, LifecycleContext, NoopHooks};
pub use lifecycle::LifecycleManager;
pub use metadata::{
    ComponentInfo, HealthState, HealthStatus, LifecyclePhase, LifecycleStatus,
};
