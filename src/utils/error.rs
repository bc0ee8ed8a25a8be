//! 组合内核错误类型定义
//!
//! 本模块定义了内核中使用的所有错误类型。错误分为四大类：
//!
//! - 状态错误：阶段调用时管理器不处于要求的前置状态
//! - 依赖错误：依赖缺失或存在循环依赖
//! - 组件操作错误：某个组件的生命周期钩子返回错误
//! - 重复注册错误：同名组件被注册两次

use thiserror::Error;

use crate::component::metadata::{LifecyclePhase, LifecycleStatus};

/// 组合内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 生命周期状态错误 ====================

    /// 阶段调用时管理器状态不满足前置条件
    #[error("状态错误: {phase} 需要状态 {expected}, 当前状态为 {actual}")]
    InvalidState {
        phase: LifecyclePhase,
        expected: LifecycleStatus,
        actual: LifecycleStatus,
    },

    // ==================== 依赖错误 ====================

    /// 组件声明的依赖不存在
    #[error("组件 '{component}' 的依赖 '{dependency}' 未找到")]
    DependencyNotFound {
        component: String,
        dependency: String,
    },

    /// 检测到循环依赖
    #[error("检测到循环依赖: 组件 '{component}' ({})", .cycle.join(" -> "))]
    CircularDependency {
        component: String,
        cycle: Vec<String>,
    },

    // ==================== 组件错误 ====================

    /// 组件钩子执行失败
    #[error("组件 '{component}' 在 {phase} 阶段失败: {source}")]
    ComponentOperationFailed {
        component: String,
        phase: LifecyclePhase,
        #[source]
        source: Box<CoreError>,
    },

    /// 组件重复注册
    #[error("组件已注册: '{0}'")]
    DuplicateComponent(String),

    /// 组件未找到
    #[error("组件未找到: '{0}'")]
    ComponentNotFound(String),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 操作被取消
    #[error("操作被取消")]
    Cancelled,

    /// 其他错误（通常来自组件实现中的 anyhow 错误）
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 生命周期错误 (LIFECYCLE-xxx)
    pub const LIFECYCLE_INVALID_STATE: &str = "LIFECYCLE-001";
    pub const LIFECYCLE_COMPONENT_FAILED: &str = "LIFECYCLE-002";
    pub const LIFECYCLE_CANCELLED: &str = "LIFECYCLE-003";

    // 依赖错误 (DEPENDENCY-xxx)
    pub const DEPENDENCY_NOT_FOUND: &str = "DEPENDENCY-001";
    pub const DEPENDENCY_CIRCULAR: &str = "DEPENDENCY-002";

    // 注册错误 (REGISTRY-xxx)
    pub const REGISTRY_DUPLICATE: &str = "REGISTRY-001";
    pub const REGISTRY_NOT_FOUND: &str = "REGISTRY-002";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 通用错误
    pub const UNKNOWN: &str = "UNKNOWN";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidState { .. } => error_code::LIFECYCLE_INVALID_STATE,
            CoreError::ComponentOperationFailed { .. } => error_code::LIFECYCLE_COMPONENT_FAILED,
            CoreError::Cancelled => error_code::LIFECYCLE_CANCELLED,
            CoreError::DependencyNotFound { .. } => error_code::DEPENDENCY_NOT_FOUND,
            CoreError::CircularDependency { .. } => error_code::DEPENDENCY_CIRCULAR,
            CoreError::DuplicateComponent(_) => error_code::REGISTRY_DUPLICATE,
            CoreError::ComponentNotFound(_) => error_code::REGISTRY_NOT_FOUND,
            CoreError::ConfigLoadFailed(_) | CoreError::Yaml(_) | CoreError::Json(_) => {
                error_code::CONFIG_LOAD_FAILED
            }
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            _ => error_code::UNKNOWN,
        }
    }

    /// 是否为依赖解析阶段产生的错误
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            CoreError::DependencyNotFound { .. } | CoreError::CircularDependency { .. }
        )
    }

    /// 组件操作错误对应的组件名
    pub fn failed_component(&self) -> Option<&str> {
        match self {
            CoreError::ComponentOperationFailed { component, .. } => Some(component),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_not_found_names_both_sides() {
        let err = CoreError::DependencyNotFound {
            component: "A".to_string(),
            dependency: "ghost".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'A'"));
        assert!(msg.contains("'ghost'"));
        assert!(err.is_dependency_error());
    }

    #[test]
    fn test_cycle_display_joins_path() {
        let err = CoreError::CircularDependency {
            component: "a".to_string(),
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
        assert_eq!(err.error_code(), error_code::DEPENDENCY_CIRCULAR);
    }

    #[test]
    fn test_component_failure_keeps_source() {
        let err = CoreError::ComponentOperationFailed {
            component: "cache".to_string(),
            phase: LifecyclePhase::Initialize,
            source: Box::new(CoreError::Internal("连接被拒绝".to_string())),
        };
        assert_eq!(err.failed_component(), Some("cache"));
        assert!(err.to_string().contains("cache"));
        assert!(err.to_string().contains("initialize"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = CoreError::InvalidState {
            phase: LifecyclePhase::Start,
            expected: LifecycleStatus::Initialized,
            actual: LifecycleStatus::Uninitialized,
        };
        assert_eq!(err.error_code(), error_code::LIFECYCLE_INVALID_STATE);
        assert!(err.to_string().contains("uninitialized"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: CoreError = anyhow::anyhow!("插件内部错误").into();
        assert!(matches!(err, CoreError::Other(_)));
        assert_eq!(err.error_code(), error_code::UNKNOWN);
    }
}
