use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;

pub mod mem;
pub mod model;
pub mod sqlite;

pub use mem::MemStore;
pub use model::UserRecord;
pub use sqlite::SqliteStore;

/// 存储连接生命周期事件
#[derive(Debug)]
pub enum StoreEvent {
    /// 连接就绪，可以开始查询
    Ready,
    /// 连接断开
    Disconnected,
    /// 连接错误，上报后连接状态不变
    Error(anyhow::Error),
}

/// 存储事件接收端，由存储实例在创建时配套返回
pub type StoreEvents = mpsc::Receiver<StoreEvent>;

/// 存储连接目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// 网络部署的连接地址
    Url(String),
    /// 内置数据库的文件路径
    Path(PathBuf),
}

impl std::fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreTarget::Url(url) => write!(f, "{url}"),
            StoreTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 用户目录存储
///
/// connect 异步发起连接并立即返回，结果通过事件通道上报；
/// find_all 和 save 仅在 Ready 事件之后可用，save 为后写者胜
pub trait UserStore {
    /// 发起一次异步连接
    fn connect(&self, target: &StoreTarget) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 获取全部用户记录
    fn find_all(&self) -> impl std::future::Future<Output = Result<Vec<UserRecord>>> + Send;
    /// 保存单条用户记录
    fn save(&self, user: &UserRecord) -> impl std::future::Future<Output = Result<()>> + Send;
}
