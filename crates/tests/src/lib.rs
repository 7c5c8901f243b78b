//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（mock 集线器 -> 广播 -> SSE 端点 -> 查看端）
//! - 轮换期间的无间断投递

#[cfg(test)]
mod contract_tests {
    use client_reader::ViewerMessage;
    use contracts::{BridgeMessage, HubEventBatch, PingMessage};

    /// 集线器批次 -> 广播负载 -> 查看端解析，文本逐字保留
    #[test]
    fn test_hub_batch_payloads_reach_viewer_verbatim() {
        let batch = HubEventBatch::from_json(
            r#"[
                {"creationtime":"t1","id":"e1","type":"update","data":[{"id":"m1","type":"motion","motion":{"motion":true,"motion_valid":true}},{"n": 2}]},
                {"creationtime":"t2","id":"e2","type":"update","data":[{"id":"l1","type":"light","on":{"on":false}}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(batch.item_count(), 3);

        let payloads: Vec<String> = batch
            .normalize()
            .map(|event| BridgeMessage::from(event).payload().to_string())
            .collect();
        assert_eq!(
            payloads,
            vec![
                r#"{"id":"m1","type":"motion","motion":{"motion":true,"motion_valid":true}}"#,
                r#"{"n": 2}"#,
                r#"{"id":"l1","type":"light","on":{"on":false}}"#,
            ]
        );

        let labels: Vec<&str> = payloads
            .iter()
            .map(|p| {
                let message = ViewerMessage::parse(p).unwrap();
                assert!(!message.is_ping());
                message.sensor_update().unwrap().map_or("undecodable", |u| u.label())
            })
            .collect();
        assert_eq!(labels, vec!["motion", "undecodable", "light"]);
    }

    #[test]
    fn test_ping_payload_parses_as_keepalive() {
        let ping = PingMessage::now();
        let payload = BridgeMessage::from(ping.clone()).payload();
        let message = ViewerMessage::parse(&payload).unwrap();
        assert!(message.is_ping());
        assert!(ping.timestamp().is_some());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use client_reader::{ClientReader, HttpEventSource, ViewerMessage, ViewerState};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::BridgeBlueprint;
    use dispatcher::{Broadcaster, OutputChannel};
    use ingestion::{MockHubClient, RotationScheduler, UpstreamSubscriber};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    const MOTION_BATCH: &str = r#"[{"creationtime":"2024-05-01T10:00:00Z","id":"e1","type":"update","data":[{"id":"m1","motion":{"motion":true,"motion_valid":true},"type":"motion"}]}]"#;

    fn blueprint() -> BridgeBlueprint {
        ConfigLoader::load_from_str(
            r#"
[hub]
address = "hub.local"
credential = "key"

[rotation]
interval_secs = 3600
recovery_min_ms = 10
recovery_max_ms = 100

[server]
bind = "127.0.0.1:0"
ping_interval_secs = 1
client_retry_ms = 100
"#,
            ConfigFormat::Toml,
        )
        .unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    async fn within<F: Future>(future: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), future)
            .await
            .expect("timed out")
    }

    /// Bridge running against the mock hub, serving on an ephemeral port
    struct Bridge {
        hub: MockHubClient,
        broadcaster: Broadcaster,
        url: String,
        shutdown: CancellationToken,
    }

    async fn start_bridge(blueprint: &BridgeBlueprint) -> Bridge {
        let hub = MockHubClient::new();
        let broadcaster = Broadcaster::new();
        let shutdown = CancellationToken::new();

        let subscriber = Arc::new(UpstreamSubscriber::new(
            Arc::new(hub.clone()),
            broadcaster.clone(),
            blueprint.hub.clone(),
        ));
        RotationScheduler::new(subscriber.clone(), blueprint.rotation.clone())
            .spawn(shutdown.child_token());

        let listener = endpoint::bind(&blueprint.server.bind).await.unwrap();
        let url = format!(
            "http://{}{}",
            listener.local_addr().unwrap(),
            blueprint.server.path
        );
        let state = endpoint::EndpointState::new(broadcaster.clone(), blueprint.server.clone())
            .with_upstream(subscriber)
            .with_shutdown(shutdown.clone());
        tokio::spawn(endpoint::serve(listener, state));

        Bridge {
            hub,
            broadcaster,
            url,
            shutdown,
        }
    }

    /// End-to-end: MockHubClient -> UpstreamSubscriber -> Broadcaster -> SSE -> ClientReader
    #[tokio::test]
    async fn test_e2e_hub_event_reaches_viewer() {
        let blueprint = blueprint();
        let bridge = start_bridge(&blueprint).await;
        let hub = bridge.hub.clone();
        within(wait_until(|| hub.open_connections() == 1)).await;

        let mut reader_config = blueprint.reader.clone();
        reader_config.url = bridge.url.clone();
        let reader = Arc::new(ClientReader::new(
            HttpEventSource::new(reader_config.url.clone()).unwrap(),
            reader_config,
        ));
        let state = ViewerState::new();
        reader.add_handler(state.handler());
        let events = Arc::new(Mutex::new(Vec::<Value>::new()));
        let sink = events.clone();
        reader.add_handler(move |message: &ViewerMessage| {
            if let Some(event) = message.as_event() {
                sink.lock().push(event.clone());
            }
        });
        let handle = reader.start();

        let broadcaster = bridge.broadcaster.clone();
        within(wait_until(|| broadcaster.len() == 1)).await;

        assert!(bridge.hub.send_json(0, MOTION_BATCH).unwrap());
        within(wait_until(|| !events.lock().is_empty())).await;

        assert_eq!(
            events.lock()[0],
            json!({"id":"m1","motion":{"motion":true,"motion_valid":true},"type":"motion"})
        );
        let update = state.latest_sensor().unwrap();
        assert_eq!(update.label(), "motion");
        assert_eq!(update.resource_id(), Some("m1"));

        // idle connection still gets keepalives
        within(wait_until(|| state.snapshot().last_keepalive.is_some())).await;

        handle.stop();
        handle.join().await;
        within(wait_until(|| broadcaster.is_empty())).await;

        bridge.shutdown.cancel();
        within(wait_until(|| hub.open_connections() == 0)).await;
    }

    /// Every connected viewer sees the same events in the same order
    #[tokio::test]
    async fn test_e2e_fan_out_to_many_viewers() {
        let blueprint = blueprint();
        let bridge = start_bridge(&blueprint).await;
        let hub = bridge.hub.clone();
        within(wait_until(|| hub.open_connections() == 1)).await;

        let mut viewers = Vec::new();
        for _ in 0..3 {
            let mut config = blueprint.reader.clone();
            config.url = bridge.url.clone();
            let reader = Arc::new(ClientReader::new(
                HttpEventSource::new(config.url.clone()).unwrap(),
                config,
            ));
            let seen = Arc::new(Mutex::new(Vec::<String>::new()));
            let sink = seen.clone();
            reader.add_handler(move |message: &ViewerMessage| {
                if let Some(id) = message.as_event().and_then(|e| e["n"].as_u64()) {
                    sink.lock().push(id.to_string());
                }
            });
            viewers.push((reader.start(), seen));
        }

        let broadcaster = bridge.broadcaster.clone();
        within(wait_until(|| broadcaster.len() == 3)).await;

        assert!(bridge
            .hub
            .send_json(
                0,
                r#"[{"creationtime":"t","id":"e","type":"update","data":[{"n":1},{"n":2},{"n":3}]}]"#
            )
            .unwrap());

        for (_, seen) in &viewers {
            within(wait_until(|| seen.lock().len() == 3)).await;
            assert_eq!(*seen.lock(), vec!["1", "2", "3"]);
        }

        for (handle, _) in viewers {
            handle.stop();
            handle.join().await;
        }
        bridge.shutdown.cancel();
    }

    /// Shutdown closes every viewer stream and the scheduler releases the hub
    #[tokio::test]
    async fn test_e2e_shutdown_releases_everything() {
        let blueprint = blueprint();
        let bridge = start_bridge(&blueprint).await;
        let hub = bridge.hub.clone();
        within(wait_until(|| hub.open_connections() == 1)).await;

        let mut config = blueprint.reader.clone();
        config.url = bridge.url.clone();
        let reader = Arc::new(ClientReader::new(
            HttpEventSource::new(config.url.clone()).unwrap(),
            config,
        ));
        let handle = reader.start();
        let broadcaster = bridge.broadcaster.clone();
        within(wait_until(|| broadcaster.len() == 1)).await;

        bridge.shutdown.cancel();
        within(wait_until(|| broadcaster.is_empty())).await;
        within(wait_until(|| hub.open_connections() == 0)).await;

        handle.stop();
        handle.join().await;
    }

    /// Events keep flowing to a registered channel across a rotation
    #[tokio::test(start_paused = true)]
    async fn test_rotation_keeps_viewers_fed() {
        let mut blueprint = blueprint();
        blueprint.rotation.interval_secs = 60;

        let hub = MockHubClient::new();
        let broadcaster = Broadcaster::new();
        let (channel, mut rx) = OutputChannel::bounded(64);
        broadcaster.register(channel);

        let subscriber = Arc::new(UpstreamSubscriber::new(
            Arc::new(hub.clone()),
            broadcaster.clone(),
            blueprint.hub.clone(),
        ));
        let cancel = CancellationToken::new();
        let task = RotationScheduler::new(subscriber.clone(), blueprint.rotation.clone())
            .spawn(cancel.clone());

        wait_until(|| hub.open_connections() == 1).await;
        assert!(hub
            .send_json(0, r#"[{"creationtime":"t","id":"a","type":"update","data":[{"n":1}]}]"#)
            .unwrap());
        let payload = rx.recv().await.unwrap();
        assert_eq!(&*payload, r#"{"n":1}"#);

        // past the first rotation the old feed is gone and the new one delivers
        tokio::time::sleep(Duration::from_secs(61)).await;
        wait_until(|| hub.connection_count() == 2 && hub.open_connections() == 1).await;
        assert!(!hub
            .send_json(0, r#"[{"creationtime":"t","id":"b","type":"update","data":[{"n":2}]}]"#)
            .unwrap());
        assert!(hub
            .send_json(1, r#"[{"creationtime":"t","id":"c","type":"update","data":[{"n":3}]}]"#)
            .unwrap());
        let payload = rx.recv().await.unwrap();
        assert_eq!(&*payload, r#"{"n":3}"#);
        assert_eq!(subscriber.live_handles(), 1);

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(hub.open_connections(), 0);
    }
}
