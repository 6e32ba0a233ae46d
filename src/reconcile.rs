use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::engine::{EngineError, IndexHandle, RecognitionIndex};
use crate::store::{UserRecord, UserStore};

/// 单条记录对账失败
#[derive(Debug, Error)]
pub enum EnrollError {
    /// 图片 base64 解码失败
    #[error("图片解码失败: {0}")]
    Decode(#[from] base64::DecodeError),
    /// 图片暂存失败
    #[error("图片暂存失败: {0}")]
    Stage(#[from] std::io::Error),
    /// 识别引擎注册失败
    #[error("识别引擎注册失败: {0}")]
    Register(#[from] EngineError),
    /// 句柄回写存储失败，该记录等到下一轮对账重试
    #[error("回写存储失败: {0}")]
    Persist(anyhow::Error),
}

/// 一轮对账的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// 扫描的记录总数
    pub total: usize,
    /// 成功注册并回写的记录数
    pub enrolled: usize,
    /// 失败并跳过的记录数
    pub failed: usize,
}

/// 对账器
///
/// 每次存储连接就绪后执行一轮对账：全量拉取用户记录，逐条把参考图片
/// 注册进识别引擎，并把返回的句柄回写到记录上。记录之间严格串行，
/// 按存储返回的顺序处理，任意时刻在途的暂存文件和注册调用不超过一个。
pub struct Reconciler<E> {
    engine: E,
    staging: PathBuf,
}

impl<E: RecognitionIndex> Reconciler<E> {
    pub fn new(engine: E, staging: PathBuf) -> Self {
        Self { engine, staging }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 执行一轮对账
    ///
    /// 单条记录的失败会被记录并跳过，不影响其余记录
    pub async fn sweep(&mut self, store: &impl UserStore) -> Result<SweepStats> {
        let users = store.find_all().await?;
        let mut stats = SweepStats { total: users.len(), ..Default::default() };
        if users.is_empty() {
            info!("用户目录为空，跳过对账");
            return Ok(stats);
        }

        info!("开始对账，共 {} 条用户记录", stats.total);
        for mut user in users {
            match self.enroll(store, &mut user).await {
                Ok(handle) => {
                    stats.enrolled += 1;
                    info!("用户 {} 注册完成，句柄 {}", user.id, i64::from(handle));
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("用户 {} 对账失败，跳过: {e}", user.id);
                }
            }
        }
        info!("对账完成: {}/{} 条成功", stats.enrolled, stats.total);
        Ok(stats)
    }

    /// 对账单条记录：解码、暂存、注册、回写
    async fn enroll(
        &mut self,
        store: &impl UserStore,
        user: &mut UserRecord,
    ) -> Result<IndexHandle, EnrollError> {
        let data = STANDARD.decode(&user.image)?;

        tokio::fs::create_dir_all(&self.staging).await?;
        // 文件名带纳秒时间戳，便于按暂存时间排查；唯一性由 tempfile 保证
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let mut staged = tempfile::Builder::new()
            .prefix(&format!("{stamp}-"))
            .suffix(".img")
            .tempfile_in(&self.staging)?;
        staged.write_all(&data)?;

        // 引擎只接受文件路径；注册结束后暂存文件随 staged 析构删除
        let handle = self.engine.register(staged.path()).await?;

        user.index = Some(handle.into());
        store.save(user).await.map_err(EnrollError::Persist)?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::DigestIndex;
    use crate::store::MemStore;

    fn record(id: i64, image: &[u8]) -> UserRecord {
        UserRecord { id, image: STANDARD.encode(image), index: None }
    }

    fn seeded(users: Vec<UserRecord>) -> MemStore {
        let (store, _events) = MemStore::new();
        store.seed(users);
        store
    }

    #[tokio::test]
    async fn sweep_enrolls_every_record_in_store_order() {
        let store =
            seeded(vec![record(1, b"face-a"), record(2, b"face-b"), record(3, b"face-c")]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        let stats = reconciler.sweep(&store).await.unwrap();

        assert_eq!(stats, SweepStats { total: 3, enrolled: 3, failed: 0 });
        assert_eq!(reconciler.engine().len(), 3);
        let users = store.users();
        let handles: Vec<_> = users.iter().map(|u| u.index).collect();
        assert_eq!(handles, vec![Some(0), Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn empty_directory_completes_without_engine_calls() {
        let store = seeded(vec![]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        let stats = reconciler.sweep(&store).await.unwrap();

        assert_eq!(stats, SweepStats::default());
        assert!(reconciler.engine().is_empty());
    }

    #[tokio::test]
    async fn malformed_record_is_skipped() {
        let mut bad = record(2, b"");
        bad.image = "!!! not base64 !!!".to_string();
        let store = seeded(vec![record(1, b"face-a"), bad, record(3, b"face-c")]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        let stats = reconciler.sweep(&store).await.unwrap();

        assert_eq!(stats, SweepStats { total: 3, enrolled: 2, failed: 1 });
        let users = store.users();
        assert_eq!(users[0].index, Some(0));
        assert_eq!(users[1].index, None);
        assert_eq!(users[2].index, Some(1));
    }

    #[tokio::test]
    async fn rejected_image_is_skipped() {
        let store = seeded(vec![record(1, b""), record(2, b"face-b")]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        let stats = reconciler.sweep(&store).await.unwrap();

        assert_eq!(stats, SweepStats { total: 2, enrolled: 1, failed: 1 });
        let users = store.users();
        assert_eq!(users[0].index, None);
        assert_eq!(users[1].index, Some(0));
    }

    #[tokio::test]
    async fn staging_directory_is_empty_after_sweep() {
        let store = seeded(vec![record(1, b"face-a"), record(2, b"face-b")]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        reconciler.sweep(&store).await.unwrap();

        let leftover = std::fs::read_dir(staging.path()).unwrap().count();
        assert_eq!(leftover, 0);
    }

    /// 统计在途注册数量的探针引擎
    struct ProbeIndex {
        registered: usize,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl ProbeIndex {
        fn new() -> Self {
            Self {
                registered: 0,
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl RecognitionIndex for ProbeIndex {
        async fn register(&mut self, image: &Path) -> Result<IndexHandle, EngineError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::task::yield_now().await;
            tokio::fs::read(image).await?;
            tokio::task::yield_now().await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.registered += 1;
            Ok(IndexHandle(self.registered as i64 - 1))
        }
    }

    #[tokio::test]
    async fn registrations_never_overlap() {
        let users = (1..=5).map(|id| record(id, format!("face-{id}").as_bytes())).collect();
        let store = seeded(users);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(ProbeIndex::new(), staging.path().to_path_buf());

        let stats = reconciler.sweep(&store).await.unwrap();

        assert_eq!(stats.enrolled, 5);
        assert_eq!(reconciler.engine().max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_sweep_re_registers_everyone() {
        let store = seeded(vec![record(1, b"face-a"), record(2, b"face-b")]);
        let staging = tempfile::tempdir().unwrap();
        let mut reconciler = Reconciler::new(DigestIndex::new(), staging.path().to_path_buf());

        reconciler.sweep(&store).await.unwrap();
        let stats = reconciler.sweep(&store).await.unwrap();

        // 基线行为：每轮对账全量重新注册，句柄取最新一轮的值
        assert_eq!(stats, SweepStats { total: 2, enrolled: 2, failed: 0 });
        assert_eq!(reconciler.engine().len(), 4);
        let handles: Vec<_> = store.users().iter().map(|u| u.index).collect();
        assert_eq!(handles, vec![Some(2), Some(3)]);
    }
}
