use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_store};
use crate::config::{Opts, OutputFormat, StoreOptions};
use crate::store::UserStore;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    #[command(flatten)]
    pub store: StoreOptions,
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = open_store(opts, &self.store).await?;
        let users = store.find_all().await?;
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&users)?);
            }
            OutputFormat::Table => {
                for user in &users {
                    let index =
                        user.index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string());
                    println!("{}\t{}", user.id, index);
                }
            }
        }
        Ok(())
    }
}
