//! Bridge 指标收集模块
//!
//! 通过 `metrics` facade 记录上游订阅、广播扇出、下游连接和客户端读取的运行指标。
//! 未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录收到的上游批次
///
/// 每收到一个 hub SSE 消息调用一次。
pub fn record_hub_batch(envelopes: usize, items: usize) {
    counter!("hue_bridge_hub_batches_total").increment(1);
    counter!("hue_bridge_hub_items_total").increment(items as u64);
    histogram!("hue_bridge_hub_batch_envelopes").record(envelopes as f64);
}

/// 记录上游流错误
pub fn record_upstream_stream_error(kind: &str) {
    counter!(
        "hue_bridge_upstream_stream_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录当前存活的上游连接数
pub fn record_live_upstreams(count: usize) {
    gauge!("hue_bridge_upstream_live_handles").set(count as f64);
}

/// 记录连接轮换结果
pub fn record_rotation(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hue_bridge_rotations_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次广播
///
/// # Example
///
/// ```ignore
/// let report = broadcaster.broadcast(&message);
/// observability::record_broadcast(message.kind(), report.delivered, report.removed.len());
/// ```
pub fn record_broadcast(kind: &str, delivered: usize, removed: usize) {
    counter!(
        "hue_bridge_messages_broadcast_total",
        "kind" => kind.to_string()
    )
    .increment(1);
    counter!("hue_bridge_channel_writes_total").increment(delivered as u64);
    if removed > 0 {
        counter!("hue_bridge_channel_write_failures_total").increment(removed as u64);
    }
}

/// 记录当前连接的 viewer 数
pub fn record_viewers(count: usize) {
    gauge!("hue_bridge_viewers_connected").set(count as f64);
}

/// 记录 ping 发送结果
pub fn record_ping(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hue_bridge_pings_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录 viewer 会话时长 (秒)
pub fn record_viewer_session_secs(secs: f64) {
    histogram!("hue_bridge_viewer_session_seconds").record(secs);
}

/// 记录客户端重连
pub fn record_reader_reconnect(delay_ms: u64) {
    counter!("hue_bridge_reader_reconnects_total").increment(1);
    histogram!("hue_bridge_reader_reconnect_delay_ms").record(delay_ms as f64);
}

/// 记录客户端因解析失败丢弃的消息
pub fn record_reader_parse_dropped() {
    counter!("hue_bridge_reader_parse_dropped_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_hub_batch(2, 3);
        record_upstream_stream_error("ended");
        record_live_upstreams(1);
        record_rotation(true);
        record_broadcast("event", 4, 1);
        record_viewers(4);
        record_ping(false);
        record_viewer_session_secs(1.5);
        record_reader_reconnect(1000);
        record_reader_parse_dropped();
    }
}
