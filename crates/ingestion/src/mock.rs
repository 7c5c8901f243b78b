//! Mock 集线器客户端
//!
//! 用于无真实集线器环境的测试，支持注入失败场景。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{
    ConnectError, HubBatchStream, HubClient, HubEventBatch, HubSession, StreamError,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::instrument;

type FeedItem = Result<HubEventBatch, StreamError>;

/// 连接生命周期事件（按发生顺序记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// 第 n 个连接已建立
    Opened(usize),
    /// 第 n 个连接已释放（流被丢弃）
    Released(usize),
}

#[derive(Default)]
struct MockInner {
    /// 每个连接的发送端，下标即连接序号
    feeds: Mutex<Vec<mpsc::UnboundedSender<FeedItem>>>,
    /// 生命周期事件日志
    log: Mutex<Vec<MockEvent>>,
    /// 接下来应失败的 subscribe 次数
    fail_subscribes: AtomicUsize,
    /// 是否拒绝凭据
    reject_credential: AtomicBool,
    /// 当前未释放的连接数
    open_connections: AtomicUsize,
}

/// Mock 集线器客户端
///
/// 每次 `subscribe` 产生一个新连接；测试通过连接序号推送批次或注入故障。
#[derive(Clone, Default)]
pub struct MockHubClient {
    inner: Arc<MockInner>,
}

impl MockHubClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来 `n` 次 subscribe 失败
    pub fn fail_next_subscribes(&self, n: usize) {
        self.inner.fail_subscribes.store(n, Ordering::SeqCst);
    }

    /// 让 authenticate 与 subscribe 拒绝凭据
    pub fn reject_credential(&self) {
        self.inner.reject_credential.store(true, Ordering::SeqCst);
    }

    /// 向第 `conn` 个连接推送一个批次
    ///
    /// 连接不存在或已释放时返回 false
    pub fn send_batch(&self, conn: usize, batch: HubEventBatch) -> bool {
        self.send(conn, Ok(batch))
    }

    /// 解析 JSON 并推送
    pub fn send_json(&self, conn: usize, json: &str) -> Result<bool, StreamError> {
        Ok(self.send_batch(conn, HubEventBatch::from_json(json)?))
    }

    /// 在第 `conn` 个连接上注入流错误
    pub fn kill(&self, conn: usize, error: StreamError) -> bool {
        self.send(conn, Err(error))
    }

    fn send(&self, conn: usize, item: FeedItem) -> bool {
        self.inner
            .feeds
            .lock()
            .get(conn)
            .is_some_and(|tx| tx.send(item).is_ok())
    }

    /// 已建立过的连接总数
    pub fn connection_count(&self) -> usize {
        self.inner.feeds.lock().len()
    }

    /// 当前未释放的连接数
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    /// 生命周期事件日志快照
    pub fn events(&self) -> Vec<MockEvent> {
        self.inner.log.lock().clone()
    }

    fn check_credential(&self, address: &str) -> Result<(), ConnectError> {
        if self.inner.reject_credential.load(Ordering::SeqCst) {
            return Err(ConnectError::from_status(address, 403));
        }
        Ok(())
    }
}

/// 连接流被丢弃时记录释放事件
struct ReleaseGuard {
    conn: usize,
    inner: Arc<MockInner>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
        self.inner.log.lock().push(MockEvent::Released(self.conn));
    }
}

impl HubClient for MockHubClient {
    #[instrument(name = "mock_hub_authenticate", skip(self, credential), fields(address = %address))]
    async fn authenticate(&self, address: &str, credential: &str) -> Result<HubSession, ConnectError> {
        let _ = credential;
        self.check_credential(address)?;
        Ok(HubSession {
            address: address.to_string(),
            bridge_id: Some("mock-bridge".to_string()),
        })
    }

    #[instrument(name = "mock_hub_subscribe", skip(self, credential), fields(address = %address))]
    async fn subscribe(&self, address: &str, credential: &str) -> Result<HubBatchStream, ConnectError> {
        let _ = credential;
        self.check_credential(address)?;

        let should_fail = self
            .inner
            .fail_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ConnectError::unreachable(address, "injected failure"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let conn = {
            let mut feeds = self.inner.feeds.lock();
            feeds.push(tx);
            feeds.len() - 1
        };
        self.inner.open_connections.fetch_add(1, Ordering::SeqCst);
        self.inner.log.lock().push(MockEvent::Opened(conn));

        let guard = ReleaseGuard {
            conn,
            inner: self.inner.clone(),
        };
        let feed = stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|item| (item, (rx, guard)))
        });
        Ok(feed.boxed())
    }
}
