use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use tokio::sync::mpsc;

use super::{StoreEvent, StoreEvents, StoreTarget, UserRecord, UserStore};

/// 内存版用户目录存储，用于测试和本地演示
///
/// connect 直接上报 Ready 并记录调用情况；
/// 事件发送端可以克隆出来，按需注入断连等事件
pub struct MemStore {
    users: Mutex<Vec<UserRecord>>,
    events: mpsc::Sender<StoreEvent>,
    connects: AtomicUsize,
    targets: Mutex<Vec<StoreTarget>>,
}

impl MemStore {
    pub fn new() -> (Self, StoreEvents) {
        let (tx, rx) = mpsc::channel(16);
        let store = Self {
            users: Mutex::new(vec![]),
            events: tx,
            connects: AtomicUsize::new(0),
            targets: Mutex::new(vec![]),
        };
        (store, rx)
    }

    /// 预置用户记录
    pub fn seed(&self, users: Vec<UserRecord>) {
        *self.users.lock().unwrap() = users;
    }

    /// 当前全部用户记录
    pub fn users(&self) -> Vec<UserRecord> {
        self.users.lock().unwrap().clone()
    }

    /// 事件发送端，可用于注入 Disconnected / Error 事件
    pub fn event_sender(&self) -> mpsc::Sender<StoreEvent> {
        self.events.clone()
    }

    /// connect 被调用的次数
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 历次 connect 使用的目标
    pub fn targets(&self) -> Vec<StoreTarget> {
        self.targets.lock().unwrap().clone()
    }
}

impl UserStore for MemStore {
    async fn connect(&self, target: &StoreTarget) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        let _ = self.events.send(StoreEvent::Ready).await;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn save(&self, user: &UserRecord) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user.clone(),
            None => users.push(user.clone()),
        }
        Ok(())
    }
}
