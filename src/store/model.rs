use serde::Serialize;
use sqlx::FromRow;

/// 用户记录
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserRecord {
    /// 用户 ID，由存储分配
    pub id: i64,
    /// 参考照片，base64 编码
    #[serde(skip_serializing)]
    pub image: String,
    /// 识别引擎内存索引中的句柄，由对账流程写入
    ///
    /// 索引随进程重启重建，上一次运行留下的句柄视为过期
    #[sqlx(rename = "idx")]
    pub index: Option<i64>,
}
