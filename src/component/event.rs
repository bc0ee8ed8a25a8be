//! 生命周期事件与监听器
//!
//! 事件分发是"发出即忘"的：触发事件的阶段调用不会等待监听器完成，
//! 也不会收到监听器返回的错误。
//!
//! # 分发策略
//!
//! - 每个监听器在独立的 tokio 任务中执行
//! - 同时运行的监听器任务数受信号量限制，许可耗尽时直接丢弃该次通知
//! - 每次通知都有超时，超时后任务被取消并释放许可
//! - 监听器 panic 会被捕获并计入失败次数

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::component::metadata::{LifecyclePhase, LifecycleStatus};
use crate::utils::Result;

/// 管理器级事件使用的组件名
pub const MANAGER_COMPONENT: &str = "lifecycle-manager";

/// 默认同时运行的监听器任务上限
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// 默认单次通知超时时间（毫秒）
pub const DEFAULT_LISTENER_TIMEOUT_MS: u64 = 30_000;

/// 生命周期事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEventType {
    /// 初始化
    Initialize,
    /// 启动
    Start,
    /// 停止
    Stop,
    /// 关闭
    Shutdown,
    /// 错误
    Error,
}

impl From<LifecyclePhase> for LifecycleEventType {
    fn from(phase: LifecyclePhase) -> Self {
        match phase {
            LifecyclePhase::Initialize => LifecycleEventType::Initialize,
            LifecyclePhase::Start => LifecycleEventType::Start,
            LifecyclePhase::Stop => LifecycleEventType::Stop,
            LifecyclePhase::Shutdown => LifecycleEventType::Shutdown,
        }
    }
}

/// 生命周期事件
///
/// 每次状态转换时临时创建，交给监听器后不保留。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// 事件唯一标识
    pub event_id: String,

    /// 事件类型
    pub event_type: LifecycleEventType,

    /// 组件名，管理器级事件为 [`MANAGER_COMPONENT`]
    pub component: String,

    /// 事件时间戳
    pub timestamp: DateTime<Utc>,

    /// 事件发生时的状态
    pub status: LifecycleStatus,

    /// 错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LifecycleEvent {
    /// 创建组件事件
    pub fn new(
        event_type: LifecycleEventType,
        component: impl Into<String>,
        status: LifecycleStatus,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            component: component.into(),
            timestamp: Utc::now(),
            status,
            error: None,
        }
    }

    /// 创建管理器级事件
    pub fn manager(event_type: LifecycleEventType, status: LifecycleStatus) -> Self {
        Self::new(event_type, MANAGER_COMPONENT, status)
    }

    /// 附加错误信息
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// 是否为管理器级事件
    pub fn is_manager_event(&self) -> bool {
        self.component == MANAGER_COMPONENT
    }
}

/// 生命周期监听器
///
/// 返回值只用于统计和日志，不会传递给阶段调用方。
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    /// 处理生命周期事件
    async fn on_lifecycle_event(&self, event: LifecycleEvent) -> Result<()>;
}

/// 基于闭包的监听器
pub struct FnListener<F> {
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&LifecycleEvent) -> Result<()> + Send + Sync,
{
    /// 使用闭包创建监听器
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> LifecycleListener for FnListener<F>
where
    F: Fn(&LifecycleEvent) -> Result<()> + Send + Sync,
{
    async fn on_lifecycle_event(&self, event: LifecycleEvent) -> Result<()> {
        (self.callback)(&event)
    }
}

/// 分发器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 同时运行的监听器任务上限
    pub max_in_flight: usize,

    /// 单次通知超时时间
    pub handler_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            handler_timeout: Duration::from_millis(DEFAULT_LISTENER_TIMEOUT_MS),
        }
    }
}

/// 分发统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// 已派发的通知数
    pub dispatched: u64,
    /// 成功处理数
    pub succeeded: u64,
    /// 失败数（含 panic）
    pub failed: u64,
    /// 超时数
    pub timeouts: u64,
    /// 因并发上限被丢弃的通知数
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timeouts: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchCounters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// 生命周期事件分发器
///
/// 监听器列表只追加，不去重，也不支持移除。
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
    permits: Arc<Semaphore>,
    handler_timeout: Duration,
    counters: Arc<DispatchCounters>,
}

impl EventDispatcher {
    /// 创建分发器
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            handler_timeout: config.handler_timeout,
            counters: Arc::new(DispatchCounters::default()),
        }
    }

    /// 追加监听器
    pub async fn add_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.write().await.push(listener);
    }

    /// 已注册的监听器数量
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// 发布事件
    ///
    /// 为每个监听器派发一个独立任务后立即返回，不等待任何监听器。
    /// 返回实际派发的任务数。
    pub async fn publish(&self, event: LifecycleEvent) -> usize {
        let listeners = self.listeners.read().await.clone();
        if listeners.is_empty() {
            trace!(event_type = ?event.event_type, "没有监听器");
            return 0;
        }

        let mut spawned = 0;
        for listener in listeners {
            let permit = match self.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event_id = %event.event_id,
                        component = %event.component,
                        "监听器任务已达上限，丢弃本次通知"
                    );
                    continue;
                }
            };

            let event = event.clone();
            let counters = self.counters.clone();
            let handler_timeout = self.handler_timeout;
            counters.dispatched.fetch_add(1, Ordering::Relaxed);

            tokio::spawn(async move {
                let _permit = permit;
                let event_id = event.event_id.clone();
                let outcome = timeout(
                    handler_timeout,
                    AssertUnwindSafe(listener.on_lifecycle_event(event)).catch_unwind(),
                )
                .await;

                match outcome {
                    Ok(Ok(Ok(()))) => {
                        counters.succeeded.fetch_add(1, Ordering::Relaxed);
                        trace!(event_id = %event_id, "监听器处理成功");
                    }
                    Ok(Ok(Err(e))) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(event_id = %event_id, error = %e, "监听器处理失败");
                    }
                    Ok(Err(_)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(event_id = %event_id, "监听器 panic");
                    }
                    Err(_) => {
                        counters.timeouts.fetch_add(1, Ordering::Relaxed);
                        warn!(event_id = %event_id, "监听器处理超时");
                    }
                }
            });
            spawned += 1;
        }

        debug!(spawned, "生命周期事件已派发");
        spawned
    }

    /// 分发统计
    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::CoreError;
    use tokio::sync::{mpsc, Notify};

    struct ChannelListener {
        tx: mpsc::UnboundedSender<LifecycleEvent>,
    }

    #[async_trait]
    impl LifecycleListener for ChannelListener {
        async fn on_lifecycle_event(&self, event: LifecycleEvent) -> Result<()> {
            let _ = self.tx.send(event);
            Ok(())
        }
    }

    struct BlockingListener {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl LifecycleListener for BlockingListener {
        async fn on_lifecycle_event(&self, _event: LifecycleEvent) -> Result<()> {
            self.release.notified().await;
            Ok(())
        }
    }

    async fn wait_for<F: Fn(DispatchStats) -> bool>(dispatcher: &EventDispatcher, check: F) {
        for _ in 0..100 {
            if check(dispatcher.stats()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("等待分发统计超时: {:?}", dispatcher.stats());
    }

    #[test]
    fn test_event_construction() {
        let event = LifecycleEvent::manager(
            LifecycleEventType::Initialize,
            LifecycleStatus::Initializing,
        );
        assert!(event.is_manager_event());
        assert_eq!(event.component, MANAGER_COMPONENT);
        assert!(event.error.is_none());

        let failed = LifecycleEvent::new(LifecycleEventType::Error, "cache", LifecycleStatus::Error)
            .with_error("连接超时");
        assert!(!failed.is_manager_event());
        assert_eq!(failed.error.as_deref(), Some("连接超时"));
    }

    #[test]
    fn test_phase_to_event_type() {
        assert_eq!(
            LifecycleEventType::from(LifecyclePhase::Stop),
            LifecycleEventType::Stop
        );
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let dispatcher = EventDispatcher::default();
        let event = LifecycleEvent::manager(LifecycleEventType::Start, LifecycleStatus::Starting);
        assert_eq!(dispatcher.publish(event).await, 0);
        assert_eq!(dispatcher.stats(), DispatchStats::default());
    }

    #[tokio::test]
    async fn test_publish_reaches_every_listener() {
        let dispatcher = EventDispatcher::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher
            .add_listener(Arc::new(ChannelListener { tx: tx.clone() }))
            .await;
        dispatcher.add_listener(Arc::new(ChannelListener { tx })).await;
        assert_eq!(dispatcher.listener_count().await, 2);

        let event = LifecycleEvent::manager(LifecycleEventType::Start, LifecycleStatus::Running);
        assert_eq!(dispatcher.publish(event).await, 2);

        for _ in 0..2 {
            let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(received.status, LifecycleStatus::Running);
        }
        wait_for(&dispatcher, |s| s.succeeded == 2).await;
    }

    #[tokio::test]
    async fn test_listener_error_is_counted() {
        let dispatcher = EventDispatcher::default();
        dispatcher
            .add_listener(Arc::new(FnListener::new(|_event: &LifecycleEvent| {
                Err(CoreError::Internal("监听器故障".to_string()))
            })))
            .await;

        let event = LifecycleEvent::manager(LifecycleEventType::Stop, LifecycleStatus::Stopping);
        dispatcher.publish(event).await;
        wait_for(&dispatcher, |s| s.failed == 1).await;
    }

    #[tokio::test]
    async fn test_listener_panic_is_isolated() {
        let dispatcher = EventDispatcher::default();
        dispatcher
            .add_listener(Arc::new(FnListener::new(|_event: &LifecycleEvent| {
                panic!("监听器崩溃")
            })))
            .await;

        let event = LifecycleEvent::manager(LifecycleEventType::Stop, LifecycleStatus::Stopping);
        dispatcher.publish(event).await;
        wait_for(&dispatcher, |s| s.failed == 1).await;
    }

    #[tokio::test]
    async fn test_drop_when_saturated() {
        let dispatcher = EventDispatcher::new(DispatcherConfig {
            max_in_flight: 1,
            handler_timeout: Duration::from_secs(5),
        });
        let release = Arc::new(Notify::new());
        dispatcher
            .add_listener(Arc::new(BlockingListener {
                release: release.clone(),
            }))
            .await;

        let event = LifecycleEvent::manager(LifecycleEventType::Start, LifecycleStatus::Starting);
        assert_eq!(dispatcher.publish(event.clone()).await, 1);
        assert_eq!(dispatcher.publish(event).await, 0);
        assert_eq!(dispatcher.stats().dropped, 1);

        release.notify_one();
        wait_for(&dispatcher, |s| s.succeeded == 1).await;
    }

    #[tokio::test]
    async fn test_slow_listener_times_out() {
        let dispatcher = EventDispatcher::new(DispatcherConfig {
            max_in_flight: 4,
            handler_timeout: Duration::from_millis(50),
        });
        dispatcher
            .add_listener(Arc::new(BlockingListener {
                release: Arc::new(Notify::new()),
            }))
            .await;

        let event = LifecycleEvent::manager(LifecycleEventType::Start, LifecycleStatus::Starting);
        dispatcher.publish(event).await;
        wait_for(&dispatcher, |s| s.timeouts == 1).await;
    }
}
