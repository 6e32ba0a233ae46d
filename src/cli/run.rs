use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::time::Duration;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, StoreOptions};
use crate::conn::{ConnectionManager, RetryPolicy};
use crate::engine::DigestIndex;
use crate::reconcile::Reconciler;
use crate::store::SqliteStore;

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub store: StoreOptions,
    /// 断连后的重连间隔（毫秒），不填则立即重连
    #[arg(long, value_name = "MS")]
    pub retry_interval: Option<u64>,
}

impl SubCommandExtend for RunCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let target = self.store.target(&opts.conf_dir);
        let retry = match self.retry_interval {
            Some(ms) => RetryPolicy::Fixed(Duration::from_millis(ms)),
            None => RetryPolicy::Immediate,
        };

        let (store, events) = SqliteStore::new(self.store.verbose_queries());
        let mut manager = ConnectionManager::new(store, events, target, retry);
        let mut reconciler = Reconciler::new(DigestIndex::new(), opts.conf_dir.staging());

        manager
            .run(async move |store| {
                let stats = reconciler.sweep(store).await?;
                info!(
                    "本轮对账: 共 {} 条，成功 {} 条，失败 {} 条",
                    stats.total, stats.enrolled, stats.failed
                );
                Ok(())
            })
            .await
    }
}
