//! 组件钩子与注册表
//!
//! 生命周期管理器不直接持有组件实例，而是通过注入的 [`ComponentHooks`] 分发钩子调用。
//!
//! - [`Component`] - 组件能力描述：每个钩子都有空操作默认实现，组件只需覆盖关心的钩子
//! - [`ComponentRegistry`] - 显式构造的组件注册表，按组件名查找实例并分发钩子
//! - [`NoopHooks`] - 占位实现，所有钩子均为空操作
//! - [`LifecycleContext`] - 贯穿每次阶段调用的上下文，携带取消令牌

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::component::metadata::{ComponentInfo, HealthStatus, LifecyclePhase};
use crate::utils::{CoreError, Result};

/// 生命周期上下文
///
/// 管理器只负责把上下文传给每个钩子，不会在组件之间轮询取消状态
/// （除非在配置中显式开启 `check_cancellation`）。
#[derive(Debug, Clone, Default)]
pub struct LifecycleContext {
    token: CancellationToken,
}

impl LifecycleContext {
    /// 创建新的上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的取消令牌创建上下文
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// 取消令牌
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 是否已被取消
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// 组件能力描述
///
/// 所有生命周期钩子都有默认的空操作实现，没有实现某个钩子不视为错误。
///
/// # 示例
///
/// ```rust
/// use async_trait::async_trait;
/// use composer_core::component::hooks::{Component, LifecycleContext};
/// use composer_core::Result;
///
/// struct Cache;
///
/// #[async_trait]
/// impl Component for Cache {
///     fn name(&self) -> &str {
///         "cache"
///     }
///
///     fn dependencies(&self) -> Vec<String> {
///         vec!["db".to_string()]
///     }
///
///     async fn start(&self, _ctx: &LifecycleContext) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync {
    /// 组件名
    fn name(&self) -> &str;

    /// 声明的依赖组件名
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// 初始化钩子
    async fn init(&self, _ctx: &LifecycleContext) -> Result<()> {
        Ok(())
    }

    /// 启动钩子
    async fn start(&self, _ctx: &LifecycleContext) -> Result<()> {
        Ok(())
    }

    /// 停止钩子
    async fn stop(&self, _ctx: &LifecycleContext) -> Result<()> {
        Ok(())
    }

    /// 关闭钩子
    async fn shutdown(&self, _ctx: &LifecycleContext) -> Result<()> {
        Ok(())
    }

    /// 健康检查钩子
    async fn health_check(&self, _ctx: &LifecycleContext) -> Result<HealthStatus> {
        Ok(HealthStatus::healthy())
    }

    /// 生成组件描述符
    fn descriptor(&self) -> ComponentInfo {
        ComponentInfo::new(self.name()).with_dependencies(self.dependencies())
    }
}

/// 钩子分发接口
///
/// 约定：调用组件对应阶段的钩子；钩子返回的错误原样返回；
/// 组件没有对应能力（或没有实例）时返回 `Ok(())`。
#[async_trait]
pub trait ComponentHooks: Send + Sync {
    /// 调用指定组件在某个阶段的钩子
    async fn invoke(
        &self,
        component: &str,
        phase: LifecyclePhase,
        ctx: &LifecycleContext,
    ) -> Result<()>;

    /// 对指定组件执行健康检查
    async fn health_check(&self, _component: &str, _ctx: &LifecycleContext) -> Result<HealthStatus> {
        Ok(HealthStatus::healthy())
    }
}

/// 空操作钩子
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl ComponentHooks for NoopHooks {
    async fn invoke(
        &self,
        component: &str,
        phase: LifecyclePhase,
        _ctx: &LifecycleContext,
    ) -> Result<()> {
        debug!(component = %component, phase = %phase, "空操作钩子");
        Ok(())
    }
}

/// 组件注册表
///
/// 在进程启动时显式构造，并通过 `Arc` 传给生命周期管理器等使用方。
/// 组件在启动阶段通过 [`register`](Self::register) 静态注册。
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<dyn Component>>>,
}

impl ComponentRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册组件实例
    ///
    /// # 错误
    ///
    /// 同名组件已注册时返回 `CoreError::DuplicateComponent`
    pub async fn register(&self, component: Arc<dyn Component>) -> Result<()> {
        let name = component.name().to_string();
        let mut components = self.components.write().await;

        if components.contains_key(&name) {
            return Err(CoreError::DuplicateComponent(name));
        }

        components.insert(name.clone(), component);
        info!(component = %name, "组件实例已注册");
        Ok(())
    }

    /// 查找组件实例
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.read().await.get(name).cloned()
    }

    /// 是否包含指定组件
    pub async fn contains(&self, name: &str) -> bool {
        self.components.read().await.contains_key(name)
    }

    /// 已注册组件数量
    pub async fn count(&self) -> usize {
        self.components.read().await.len()
    }

    /// 所有组件的描述符（按名称排序）
    pub async fn descriptors(&self) -> Vec<ComponentInfo> {
        let components = self.components.read().await;
        let mut descriptors: Vec<ComponentInfo> =
            components.values().map(|c| c.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

#[async_trait]
impl ComponentHooks for ComponentRegistry {
    async fn invoke(
        &self,
        component: &str,
        phase: LifecyclePhase,
        ctx: &LifecycleContext,
    ) -> Result<()> {
        // 先释放读锁，再执行钩子
        let Some(instance) = self.get(component).await else {
            debug!(component = %component, phase = %phase, "组件没有实例，跳过钩子");
            return Ok(());
        };

        match phase {
            LifecyclePhase::Initialize => instance.init(ctx).await,
            LifecyclePhase::Start => instance.start(ctx).await,
            LifecyclePhase::Stop => instance.stop(ctx).await,
            LifecyclePhase::Shutdown => instance.shutdown(ctx).await,
        }
    }

    async fn health_check(&self, component: &str, ctx: &LifecycleContext) -> Result<HealthStatus> {
        match self.get(component).await {
            Some(instance) => instance.health_check(ctx).await,
            None => Ok(HealthStatus::degraded(format!("组件 '{}' 没有实例", component))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn dependencies(&self) -> Vec<String> {
            vec!["db".to_string()]
        }

        async fn start(&self, _ctx: &LifecycleContext) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{}:start", self.name));
            Ok(())
        }

        async fn stop(&self, _ctx: &LifecycleContext) -> Result<()> {
            Err(CoreError::Internal("停止失败".to_string()))
        }
    }

    fn recorder(name: &str) -> (Arc<Recorder>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Recorder {
                name: name.to_string(),
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn test_register_and_duplicate() {
        let registry = ComponentRegistry::new();
        let (cache, _) = recorder("cache");
        registry.register(cache.clone()).await.unwrap();

        let result = registry.register(cache).await;
        assert!(matches!(result, Err(CoreError::DuplicateComponent(name)) if name == "cache"));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_dispatch_to_overridden_hook() {
        let registry = ComponentRegistry::new();
        let (cache, calls) = recorder("cache");
        registry.register(cache).await.unwrap();

        let ctx = LifecycleContext::new();
        registry
            .invoke("cache", LifecyclePhase::Start, &ctx)
            .await
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["cache:start".to_string()]);
    }

    #[tokio::test]
    async fn test_default_hook_is_noop() {
        let registry = ComponentRegistry::new();
        let (cache, calls) = recorder("cache");
        registry.register(cache).await.unwrap();

        let ctx = LifecycleContext::new();
        assert!(registry
            .invoke("cache", LifecyclePhase::Initialize, &ctx)
            .await
            .is_ok());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hook_error_returned_unchanged() {
        let registry = ComponentRegistry::new();
        let (cache, _) = recorder("cache");
        registry.register(cache).await.unwrap();

        let ctx = LifecycleContext::new();
        let result = registry.invoke("cache", LifecyclePhase::Stop, &ctx).await;
        assert!(matches!(result, Err(CoreError::Internal(msg)) if msg == "停止失败"));
    }

    #[tokio::test]
    async fn test_missing_instance_is_noop() {
        let registry = ComponentRegistry::new();
        let ctx = LifecycleContext::new();
        assert!(registry
            .invoke("ghost", LifecyclePhase::Shutdown, &ctx)
            .await
            .is_ok());
        let health = registry.health_check("ghost", &ctx).await.unwrap();
        assert!(!health.is_healthy());
    }

    #[tokio::test]
    async fn test_descriptors_carry_dependencies() {
        let registry = ComponentRegistry::new();
        let (cache, _) = recorder("cache");
        registry.register(cache).await.unwrap();

        let descriptors = registry.descriptors().await;
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "cache");
        assert_eq!(descriptors[0].dependencies, vec!["db".to_string()]);
    }

    #[test]
    fn test_context_cancellation() {
        let ctx = LifecycleContext::new();
        let child = ctx.clone();
        assert!(!child.is_cancelled());
        ctx.cancel();
        assert!(child.is_cancelled());
    }
}
