//! Ingestion 错误类型

use contracts::{ConnectError, StreamError};
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 无法建立上游连接
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// 已建立的上游连接失败
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// HTTP 客户端构建失败
    #[error("failed to build hub client: {message}")]
    Client {
        /// 错误消息
        message: String,
    },

    /// 调度器在获得首个订阅前被取消
    #[error("rotation scheduler cancelled before a subscription was opened")]
    Cancelled,
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
