//! 生命周期管理器
//!
//! 持有组件描述符集合与全局生命周期状态，按依赖顺序驱动
//! Initialize / Start / Stop / Shutdown 四个阶段，并向监听器发布生命周期事件。
//!
//! # 状态机
//!
//! | 当前状态 | 调用 | 成功 | 失败 |
//! |---|---|---|---|
//! | Uninitialized | `initialize` | Initializing → Initialized | Error |
//! | Initialized | `start` | Starting → Running | Error |
//! | Running | `stop` | Stopping → Stopped | Error |
//! | 任意 | `shutdown` | ShuttingDown → Shutdown | Error |
//!
//! `Error` 状态没有定义恢复转换，只能调用 `shutdown`。
//!
//! # 并发
//!
//! 状态与组件表由同一把读写锁保护。每个阶段调用在整个执行期间持有写锁，
//! 包括依赖解析与全部钩子调用，因此阶段之间、阶段与注册之间严格串行；
//! 钩子在同一阶段内按解析顺序逐个执行。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::component::dependency::{DependencyGraph, DependencyResolver};
use crate::component::event::{
    DispatchStats, EventDispatcher, LifecycleEvent, LifecycleEventType, LifecycleListener,
    MANAGER_COMPONENT,
};
use crate::component::hooks::{ComponentHooks, LifecycleContext, NoopHooks};
use crate::component::metadata::{ComponentInfo, HealthStatus, LifecyclePhase, LifecycleStatus};
use crate::core::config::LifecycleConfig;
use crate::utils::{CoreError, Result};

/// 写锁保护的管理器状态
#[derive(Debug, Default)]
struct ManagerState {
    /// 全局生命周期状态
    status: LifecycleStatus,
    /// 组件描述符：组件名 -> ComponentInfo
    components: HashMap<String, ComponentInfo>,
}

impl ManagerState {
    fn snapshot(&self) -> Vec<ComponentInfo> {
        let mut components: Vec<ComponentInfo> = self.components.values().cloned().collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));
        components
    }
}

/// 生命周期管理器
pub struct LifecycleManager {
    state: RwLock<ManagerState>,
    hooks: Arc<dyn ComponentHooks>,
    dispatcher: EventDispatcher,
    config: LifecycleConfig,
}

impl LifecycleManager {
    /// 使用默认配置和空操作钩子创建管理器
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::default())
    }

    /// 使用指定配置创建管理器
    pub fn with_config(config: LifecycleConfig) -> Self {
        info!("创建生命周期管理器");
        Self {
            state: RwLock::new(ManagerState::default()),
            hooks: Arc::new(NoopHooks),
            dispatcher: EventDispatcher::new(config.dispatcher_config()),
            config,
        }
    }

    /// 注入钩子分发实现（通常是 `ComponentRegistry`）
    pub fn with_hooks(mut self, hooks: Arc<dyn ComponentHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    // ==================== 注册 ====================

    /// 注册组件描述符
    ///
    /// # 错误
    ///
    /// 同名组件已注册时返回 `CoreError::DuplicateComponent`
    pub async fn register_component(&self, info: ComponentInfo) -> Result<()> {
        let mut state = self.state.write().await;

        if state.components.contains_key(&info.name) {
            return Err(CoreError::DuplicateComponent(info.name));
        }

        if state.status != LifecycleStatus::Uninitialized {
            warn!(
                component = %info.name,
                status = %state.status,
                "在初始化之后注册组件，新组件会参与后续阶段"
            );
        }

        debug!(component = %info.name, dependencies = ?info.dependencies, "注册组件");
        state.components.insert(info.name.clone(), info);
        Ok(())
    }

    /// 批量注册组件描述符
    ///
    /// 遇到第一个重复名称即返回错误，此前的组件保持已注册。
    pub async fn register_components<I>(&self, components: I) -> Result<()>
    where
        I: IntoIterator<Item = ComponentInfo>,
    {
        for info in components {
            self.register_component(info).await?;
        }
        Ok(())
    }

    /// 追加生命周期监听器
    pub async fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.dispatcher.add_listener(listener).await;
    }

    // ==================== 阶段调用 ====================

    /// 初始化全部组件（依赖顺序）
    #[instrument(skip_all)]
    pub async fn initialize(&self, ctx: &LifecycleContext) -> Result<()> {
        self.run_phase(LifecyclePhase::Initialize, ctx).await
    }

    /// 启动全部组件（依赖顺序）
    #[instrument(skip_all)]
    pub async fn start(&self, ctx: &LifecycleContext) -> Result<()> {
        self.run_phase(LifecyclePhase::Start, ctx).await
    }

    /// 停止全部组件（依赖逆序）
    #[instrument(skip_all)]
    pub async fn stop(&self, ctx: &LifecycleContext) -> Result<()> {
        self.run_phase(LifecyclePhase::Stop, ctx).await
    }

    /// 关闭全部组件（依赖逆序），可从任意状态调用
    #[instrument(skip_all)]
    pub async fn shutdown(&self, ctx: &LifecycleContext) -> Result<()> {
        self.run_phase(LifecyclePhase::Shutdown, ctx).await
    }

    async fn run_phase(&self, phase: LifecyclePhase, ctx: &LifecycleContext) -> Result<()> {
        let mut state = self.state.write().await;

        if let Some(expected) = phase.required_status() {
            if state.status != expected {
                warn!(phase = %phase, status = %state.status, "当前状态不允许执行该阶段");
                return Err(CoreError::InvalidState {
                    phase,
                    expected,
                    actual: state.status,
                });
            }
        }

        info!(phase = %phase, from = %state.status, "开始生命周期阶段");
        state.status = phase.in_progress_status();
        self.dispatcher
            .publish(LifecycleEvent::manager(phase.into(), state.status))
            .await;

        let mut resolver = DependencyResolver::new();
        let mut order = match resolver.resolve_dependencies(&state.snapshot()) {
            Ok(order) => order,
            Err(e) => {
                error!(phase = %phase, error = %e, "依赖解析失败");
                state.status = LifecycleStatus::Error;
                self.publish_error(MANAGER_COMPONENT, &e).await;
                return Err(e);
            }
        };

        if phase.is_reverse() {
            order.reverse();
        }

        for component in &order {
            let name = component.name.as_str();

            if self.config.check_cancellation && ctx.is_cancelled() {
                warn!(phase = %phase, component = %name, "上下文已取消，中止阶段");
                state.status = LifecycleStatus::Error;
                let err = CoreError::Cancelled;
                self.publish_error(name, &err).await;
                return Err(err);
            }

            debug!(phase = %phase, component = %name, "调用组件钩子");
            if let Err(e) = self.hooks.invoke(name, phase, ctx).await {
                error!(phase = %phase, component = %name, error = %e, "组件钩子失败");
                state.status = LifecycleStatus::Error;
                self.publish_error(name, &e).await;
                return Err(CoreError::ComponentOperationFailed {
                    component: name.to_string(),
                    phase,
                    source: Box::new(e),
                });
            }

            let completed = phase.completed_status();
            if let Some(entry) = state.components.get_mut(name) {
                entry.status = completed;
            }
            self.dispatcher
                .publish(LifecycleEvent::new(phase.into(), name, completed))
                .await;
        }

        state.status = phase.completed_status();
        self.dispatcher
            .publish(LifecycleEvent::manager(phase.into(), state.status))
            .await;
        info!(phase = %phase, components = order.len(), status = %state.status, "生命周期阶段完成");

        Ok(())
    }

    async fn publish_error(&self, component: &str, err: &CoreError) {
        let event = LifecycleEvent::new(LifecycleEventType::Error, component, LifecycleStatus::Error)
            .with_error(err.to_string());
        self.dispatcher.publish(event).await;
    }

    // ==================== 查询 ====================

    /// 获取全局生命周期状态
    pub async fn get_status(&self) -> LifecycleStatus {
        self.state.read().await.status
    }

    /// 获取组件描述符
    pub async fn get_component(&self, name: &str) -> Option<ComponentInfo> {
        self.state.read().await.components.get(name).cloned()
    }

    /// 获取所有组件描述符（按名称排序）
    pub async fn list_components(&self) -> Vec<ComponentInfo> {
        self.state.read().await.snapshot()
    }

    /// 由当前组件集合构建依赖图
    ///
    /// 不做校验，悬空引用与环可以通过图自身的方法查询。
    pub async fn dependency_graph(&self) -> DependencyGraph {
        let state = self.state.read().await;
        DependencyGraph::from_components(state.components.values())
    }

    /// 当前组件集合的初始化顺序
    pub async fn resolved_order(&self) -> Result<Vec<String>> {
        let components = self.state.read().await.snapshot();
        let mut resolver = DependencyResolver::new();
        Ok(resolver
            .resolve_dependencies(&components)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// 已注册的监听器数量
    pub async fn listener_count(&self) -> usize {
        self.dispatcher.listener_count().await
    }

    /// 事件分发统计
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// 对全部组件执行健康检查
    ///
    /// 钩子返回错误的组件记为不健康。
    pub async fn health_check(&self, ctx: &LifecycleContext) -> HashMap<String, HealthStatus> {
        let state = self.state.read().await;
        let mut results = HashMap::with_capacity(state.components.len());

        for name in state.components.keys() {
            let status = match self.hooks.health_check(name, ctx).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(component = %name, error = %e, "健康检查失败");
                    HealthStatus::unhealthy(format!("健康检查失败: {}", e))
                }
            };
            results.insert(name.clone(), status);
        }

        results
    }

    /// 管理器配置
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
