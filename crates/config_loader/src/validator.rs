//! 配置校验模块
//!
//! 校验规则：
//! - hub.address / hub.credential 非空
//! - 轮换周期、ping 周期、队列容量 > 0
//! - 退避下限 > 0 且 <= 上限
//! - server.path 以 `/` 开头且不与 `/healthz` 冲突
//! - server.bind 为合法的 socket 地址
//! - reader.url 为 http/https 地址

use std::net::SocketAddr;

use contracts::{BridgeBlueprint, ContractError, ReaderConfig};

/// 健康检查路由，事件流不得占用
const HEALTH_PATH: &str = "/healthz";

/// 校验 BridgeBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    validate_hub(blueprint)?;
    validate_rotation(blueprint)?;
    validate_server(blueprint)?;
    validate_reader(&blueprint.reader)?;
    Ok(())
}

/// 校验集线器连接配置
fn validate_hub(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let hub = &blueprint.hub;
    if hub.address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "hub.address",
            "hub address cannot be empty",
        ));
    }
    if hub.address.contains('/') {
        return Err(ContractError::config_validation(
            "hub.address",
            format!("expected a host name or IP, got '{}'", hub.address),
        ));
    }
    if hub.credential.trim().is_empty() {
        return Err(ContractError::config_validation(
            "hub.credential",
            "hub credential cannot be empty",
        ));
    }
    if hub.connect_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "hub.connect_timeout_secs",
            "connect_timeout_secs must be > 0",
        ));
    }
    Ok(())
}

/// 校验轮换与恢复策略
fn validate_rotation(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let rotation = &blueprint.rotation;
    if rotation.interval_secs == 0 {
        return Err(ContractError::config_validation(
            "rotation.interval_secs",
            "interval_secs must be > 0",
        ));
    }
    check_backoff_range(
        "rotation.recovery_min_ms / rotation.recovery_max_ms",
        rotation.recovery_min_ms,
        rotation.recovery_max_ms,
    )
}

/// 校验事件流端点
fn validate_server(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let server = &blueprint.server;
    if server.bind.parse::<SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "server.bind",
            format!("'{}' is not a valid socket address", server.bind),
        ));
    }
    if !server.path.starts_with('/') {
        return Err(ContractError::config_validation(
            "server.path",
            format!("path must start with '/', got '{}'", server.path),
        ));
    }
    if server.path == HEALTH_PATH {
        return Err(ContractError::config_validation(
            "server.path",
            format!("'{HEALTH_PATH}' is reserved for the health check"),
        ));
    }
    if server.ping_interval_secs == 0 {
        return Err(ContractError::config_validation(
            "server.ping_interval_secs",
            "ping_interval_secs must be > 0",
        ));
    }
    if server.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "server.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

/// 校验观看端读取配置
///
/// `watch` 命令无需完整配置，单独调用此函数。
pub fn validate_reader(reader: &ReaderConfig) -> Result<(), ContractError> {
    if !(reader.url.starts_with("http://") || reader.url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "reader.url",
            format!("expected an http(s) URL, got '{}'", reader.url),
        ));
    }
    check_backoff_range(
        "reader.min_backoff_ms / reader.max_backoff_ms",
        reader.min_backoff_ms,
        reader.max_backoff_ms,
    )
}

fn check_backoff_range(field: &str, min_ms: u64, max_ms: u64) -> Result<(), ContractError> {
    if min_ms == 0 {
        return Err(ContractError::config_validation(field, "minimum backoff must be > 0"));
    }
    if min_ms > max_ms {
        return Err(ContractError::config_validation(
            field,
            format!("minimum ({min_ms}) must be <= maximum ({max_ms})"),
        ));
    }
    Ok(())
}
