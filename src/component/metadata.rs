//! 组件描述数据
//!
//! 定义组件描述符、生命周期状态和生命周期阶段等被动数据结构。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 生命周期状态
///
/// 管理器持有一个全局状态，每个组件描述符也记录自己最近一次观察到的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// 未初始化
    #[default]
    Uninitialized,
    /// 正在初始化
    Initializing,
    /// 已初始化
    Initialized,
    /// 正在启动
    Starting,
    /// 运行中
    Running,
    /// 正在停止
    Stopping,
    /// 已停止
    Stopped,
    /// 正在关闭
    ShuttingDown,
    /// 已关闭
    Shutdown,
    /// 错误状态
    Error,
}

impl LifecycleStatus {
    /// 是否处于某个阶段的执行过程中
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Initializing
                | LifecycleStatus::Starting
                | LifecycleStatus::Stopping
                | LifecycleStatus::ShuttingDown
        )
    }

    /// 字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Uninitialized => "uninitialized",
            LifecycleStatus::Initializing => "initializing",
            LifecycleStatus::Initialized => "initialized",
            LifecycleStatus::Starting => "starting",
            LifecycleStatus::Running => "running",
            LifecycleStatus::Stopping => "stopping",
            LifecycleStatus::Stopped => "stopped",
            LifecycleStatus::ShuttingDown => "shutting_down",
            LifecycleStatus::Shutdown => "shutdown",
            LifecycleStatus::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生命周期阶段
///
/// 每个阶段都是一次管理器级操作，按依赖顺序（或逆序）遍历所有组件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    /// 初始化
    Initialize,
    /// 启动
    Start,
    /// 停止
    Stop,
    /// 关闭
    Shutdown,
}

impl LifecyclePhase {
    /// 阶段要求的前置状态
    ///
    /// `Shutdown` 可以从任意状态调用，因此没有前置状态。
    pub fn required_status(&self) -> Option<LifecycleStatus> {
        match self {
            LifecyclePhase::Initialize => Some(LifecycleStatus::Uninitialized),
            LifecyclePhase::Start => Some(LifecycleStatus::Initialized),
            LifecyclePhase::Stop => Some(LifecycleStatus::Running),
            LifecyclePhase::Shutdown => None,
        }
    }

    /// 阶段执行过程中的状态
    pub fn in_progress_status(&self) -> LifecycleStatus {
        match self {
            LifecyclePhase::Initialize => LifecycleStatus::Initializing,
            LifecyclePhase::Start => LifecycleStatus::Starting,
            LifecyclePhase::Stop => LifecycleStatus::Stopping,
            LifecyclePhase::Shutdown => LifecycleStatus::ShuttingDown,
        }
    }

    /// 阶段成功完成后的状态
    pub fn completed_status(&self) -> LifecycleStatus {
        match self {
            LifecyclePhase::Initialize => LifecycleStatus::Initialized,
            LifecyclePhase::Start => LifecycleStatus::Running,
            LifecyclePhase::Stop => LifecycleStatus::Stopped,
            LifecyclePhase::Shutdown => LifecycleStatus::Shutdown,
        }
    }

    /// 是否按依赖逆序遍历（依赖方先于被依赖方处理）
    pub fn is_reverse(&self) -> bool {
        matches!(self, LifecyclePhase::Stop | LifecyclePhase::Shutdown)
    }

    /// 字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Initialize => "initialize",
            LifecyclePhase::Start => "start",
            LifecyclePhase::Stop => "stop",
            LifecyclePhase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 组件描述符
///
/// 由调用方在任何阶段调用之前创建。生命周期管理器只会修改其中的 `status` 字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// 组件名（唯一键）
    pub name: String,

    /// 声明的依赖组件名（有序）
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,

    /// 最近一次观察到的状态
    #[serde(default)]
    pub status: LifecycleStatus,
}

impl ComponentInfo {
    /// 创建无依赖的组件描述符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            status: LifecycleStatus::Uninitialized,
        }
    }

    /// 追加一个依赖
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// 追加多个依赖
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// 是否声明了对指定组件的依赖
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}

/// 健康状况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// 健康
    Healthy,
    /// 降级
    Degraded,
    /// 不健康
    Unhealthy,
}

/// 组件健康检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// 健康状况
    pub state: HealthState,

    /// 原因说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// 检查时间
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// 创建健康状态
    pub fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            reason: None,
            checked_at: Utc::now(),
        }
    }

    /// 创建降级状态
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            state: HealthState::Degraded,
            reason: Some(reason.into()),
            checked_at: Utc::now(),
        }
    }

    /// 创建不健康状态
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            reason: Some(reason.into()),
            checked_at: Utc::now(),
        }
    }

    /// 是否健康
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::healthy()
    }
}
