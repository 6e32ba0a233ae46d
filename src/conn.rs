use anyhow::Result;
use log::{error, info, warn};
use tokio::time::{Duration, sleep};

use crate::store::{StoreEvent, StoreEvents, StoreTarget, UserStore};

/// 断连重试策略
///
/// 基线策略为无条件立即重连，不限次数；对长期不可达的存储会产生
/// 密集的重试，这是接受的取舍。可替换为固定间隔重试。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// 立即重连
    #[default]
    Immediate,
    /// 固定间隔重连
    Fixed(Duration),
}

impl RetryPolicy {
    async fn pause(&self) {
        if let RetryPolicy::Fixed(interval) = self {
            sleep(*interval).await;
        }
    }
}

/// 存储连接管理器
///
/// 维护到用户目录存储的连接：发起连接、监听生命周期事件、断连后按策略
/// 用同一目标重连。连接错误只上报日志，永远不会终止进程。
pub struct ConnectionManager<S> {
    store: S,
    events: StoreEvents,
    target: StoreTarget,
    retry: RetryPolicy,
    ready_count: u64,
}

impl<S: UserStore> ConnectionManager<S> {
    pub fn new(store: S, events: StoreEvents, target: StoreTarget, retry: RetryPolicy) -> Self {
        Self { store, events, target, retry, ready_count: 0 }
    }

    /// 存储实例
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 连接就绪的累计次数
    pub fn ready_count(&self) -> u64 {
        self.ready_count
    }

    /// 发起连接并进入事件循环
    ///
    /// 每次连接就绪时调用一次 on_ready。on_ready 在循环内同步等待，
    /// 因此对账不会重叠执行；扫描期间到达的 Ready 事件会排队触发下一轮。
    /// 循环在事件通道关闭后返回。
    pub async fn run(&mut self, mut on_ready: impl AsyncFnMut(&S) -> Result<()>) -> Result<()> {
        info!("连接用户目录存储: {}", self.target);
        self.connect().await;
        while let Some(event) = self.events.recv().await {
            self.handle_event(event, &mut on_ready).await;
        }
        Ok(())
    }

    /// 处理单个生命周期事件
    async fn handle_event(
        &mut self,
        event: StoreEvent,
        on_ready: &mut impl AsyncFnMut(&S) -> Result<()>,
    ) {
        match event {
            StoreEvent::Ready => {
                self.ready_count += 1;
                info!("存储连接就绪: {}", self.target);
                if let Err(e) = on_ready(&self.store).await {
                    error!("对账失败: {e:#}");
                }
            }
            StoreEvent::Disconnected => {
                warn!("存储连接断开，准备重连: {}", self.target);
                self.retry.pause().await;
                self.connect().await;
            }
            StoreEvent::Error(e) => {
                warn!("存储连接错误: {e:#}");
            }
        }
    }

    async fn connect(&self) {
        if let Err(e) = self.store.connect(&self.target).await {
            error!("发起连接失败: {e:#}");
        }
    }
}
