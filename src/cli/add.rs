use std::path::PathBuf;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use log::info;

use crate::cli::{SubCommandExtend, open_store};
use crate::config::{Opts, StoreOptions};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub store: StoreOptions,
    /// 参考图片路径
    pub image: PathBuf,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data = tokio::fs::read(&self.image).await?;
        let store = open_store(opts, &self.store).await?;
        // 新记录的索引句柄留空，等下一轮对账写入
        let id = store.add_user(&STANDARD.encode(&data)).await?;
        info!("已添加用户记录: {}", self.image.display());
        println!("{id}");
        Ok(())
    }
}
