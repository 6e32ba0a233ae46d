mod add;
mod list;
mod run;
mod sweep;

pub use add::*;
pub use list::*;
pub use run::*;
pub use sweep::*;

use anyhow::bail;

use crate::config::{Opts, StoreOptions};
use crate::store::{SqliteStore, StoreEvent, UserStore};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 打开内置存储并等待连接就绪
///
/// 一次性命令没有重连语义，连接失败直接报错
pub(crate) async fn open_store(
    opts: &Opts,
    store_opts: &StoreOptions,
) -> anyhow::Result<SqliteStore> {
    let target = store_opts.target(&opts.conf_dir);
    let (store, mut events) = SqliteStore::new(store_opts.verbose_queries());
    store.connect(&target).await?;
    loop {
        match events.recv().await {
            Some(StoreEvent::Ready) => return Ok(store),
            Some(StoreEvent::Error(e)) => return Err(e.context("连接存储失败")),
            Some(StoreEvent::Disconnected) => bail!("存储连接断开"),
            None => bail!("存储事件通道已关闭"),
        }
    }
}
