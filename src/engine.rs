use std::path::Path;

use thiserror::Error;

/// 识别引擎内存索引中的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexHandle(pub i64);

impl From<IndexHandle> for i64 {
    fn from(handle: IndexHandle) -> i64 {
        handle.0
    }
}

/// 识别引擎注册失败
#[derive(Debug, Error)]
pub enum EngineError {
    /// 读取暂存图片失败
    #[error("读取暂存图片失败: {0}")]
    Io(#[from] std::io::Error),
    /// 引擎拒绝图片，例如没有检测到人脸
    #[error("引擎拒绝图片: {0}")]
    Rejected(String),
}

/// 识别引擎的内存索引
///
/// 索引只存在于进程内存中，进程重启后必须重新注册全部参考图片。
/// 引擎加载图片只接受文件路径，注册前需要先把图片落盘暂存。
/// 索引是进程级共享的可变资源，注册调用必须串行执行。
pub trait RecognitionIndex {
    /// 注册一张暂存在 image 路径上的参考图片，返回索引句柄
    fn register(
        &mut self,
        image: &Path,
    ) -> impl std::future::Future<Output = Result<IndexHandle, EngineError>> + Send;
}

/// 内置的摘要索引引擎
///
/// 生产部署用厂商 SDK（自带人脸检测器和关键点定位器）实现 RecognitionIndex，
/// 本地运行时用摘要索引代替：按 blake3 摘要登记图片，句柄为登记顺序
#[derive(Default)]
pub struct DigestIndex {
    entries: Vec<blake3::Hash>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已登记的图片数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecognitionIndex for DigestIndex {
    async fn register(&mut self, image: &Path) -> Result<IndexHandle, EngineError> {
        let data = tokio::fs::read(image).await?;
        if data.is_empty() {
            return Err(EngineError::Rejected("图片内容为空".to_string()));
        }
        self.entries.push(blake3::hash(&data));
        Ok(IndexHandle(self.entries.len() as i64 - 1))
    }
}
