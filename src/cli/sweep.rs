use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_store};
use crate::config::{Opts, StoreOptions};
use crate::engine::DigestIndex;
use crate::reconcile::Reconciler;

#[derive(Parser, Debug, Clone)]
pub struct SweepCommand {
    #[command(flatten)]
    pub store: StoreOptions,
}

impl SubCommandExtend for SweepCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = open_store(opts, &self.store).await?;
        let mut reconciler = Reconciler::new(DigestIndex::new(), opts.conf_dir.staging());
        let stats = reconciler.sweep(&store).await?;
        println!("{}", serde_json::to_string(&stats)?);
        Ok(())
    }
}
