use std::sync::Arc;

use anyhow::{Context, Result, bail};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use tokio::sync::{RwLock, mpsc};

use super::{StoreEvent, StoreEvents, StoreTarget, UserRecord, UserStore};

/// 内置的 sqlite 用户目录存储
///
/// connect 在后台任务中打开连接池并初始化表结构，结果通过事件通道上报。
/// 网络部署的目录服务由外部客户端实现同一套 trait，内置存储只接受本地路径。
pub struct SqliteStore {
    pool: Arc<RwLock<Option<SqlitePool>>>,
    events: mpsc::Sender<StoreEvent>,
    verbose: bool,
}

impl SqliteStore {
    /// 创建存储实例，返回配套的事件接收端
    pub fn new(verbose: bool) -> (Self, StoreEvents) {
        let (tx, rx) = mpsc::channel(16);
        (Self { pool: Arc::new(RwLock::new(None)), events: tx, verbose }, rx)
    }

    async fn open(target: &StoreTarget, verbose: bool) -> Result<SqlitePool> {
        let path = match target {
            StoreTarget::Path(path) => path.clone(),
            StoreTarget::Url(url) => bail!("内置存储不支持网络地址: {}", url),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .filename(&path)
            .create_if_missing(true);
        if verbose {
            options = options.log_statements(log::LevelFilter::Debug);
        }

        let pool = SqlitePool::connect_with(options).await?;

        // index 是 SQL 关键字，列名用 idx
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                image TEXT NOT NULL,
                idx INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(pool)
    }

    async fn pool(&self) -> Result<SqlitePool> {
        self.pool.read().await.clone().context("存储尚未连接")
    }

    /// 插入一条新用户记录，返回分配的 ID
    pub async fn add_user(&self, image: &str) -> Result<i64> {
        let pool = self.pool().await?;
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO user (image) VALUES (?) RETURNING id")
            .bind(image)
            .fetch_one(&pool)
            .await?;
        Ok(id)
    }
}

impl UserStore for SqliteStore {
    async fn connect(&self, target: &StoreTarget) -> Result<()> {
        let pool = self.pool.clone();
        let events = self.events.clone();
        let target = target.clone();
        let verbose = self.verbose;
        tokio::spawn(async move {
            match Self::open(&target, verbose).await {
                Ok(opened) => {
                    *pool.write().await = Some(opened);
                    let _ = events.send(StoreEvent::Ready).await;
                }
                Err(e) => {
                    let _ = events.send(StoreEvent::Error(e)).await;
                    let _ = events.send(StoreEvent::Disconnected).await;
                }
            }
        });
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>> {
        let pool = self.pool().await?;
        let users = sqlx::query_as::<_, UserRecord>("SELECT id, image, idx FROM user ORDER BY id")
            .fetch_all(&pool)
            .await?;
        Ok(users)
    }

    async fn save(&self, user: &UserRecord) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::query("UPDATE user SET image = ?, idx = ? WHERE id = ?")
            .bind(&user.image)
            .bind(user.index)
            .bind(user.id)
            .execute(&pool)
            .await?;
        Ok(())
    }
}
