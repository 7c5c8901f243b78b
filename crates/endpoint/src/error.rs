//! Endpoint 错误类型

use thiserror::Error;

/// Endpoint 错误
#[derive(Debug, Error)]
pub enum EndpointError {
    /// 监听地址绑定失败
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// 监听地址
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// 服务运行期间 IO 错误
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Endpoint Result 类型别名
pub type Result<T> = std::result::Result<T, EndpointError>;
