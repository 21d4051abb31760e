//! # Discovery Flows
//!
//! Announcement handling end to end: broker fanout → discovery listener →
//! registry → `DataSourceDiscovered` on the event bus.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use futures::StreamExt;
    use sensor_discovery::testing::wait_until;
    use sensor_discovery::{BrokerChannel, InMemoryBroker, SourceId, AMQ_FANOUT};
    use shared_bus::{EventPayload, DATA_SOURCE_DISCOVERED};

    use crate::integration::fixtures::{
        announce, assert_quiet, next_event, reading, send_reading, Coordinator,
    };

    fn id(s: &str) -> SourceId {
        SourceId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_announcement_registers_once() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;

        announce(&coordinator.broker, "S").await;
        announce(&coordinator.broker, "S").await;

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.name(), DATA_SOURCE_DISCOVERED);
        assert_eq!(event.payload(), &EventPayload::Source(id("S")));
        assert_quiet(&mut coordinator.events).await;

        let listener = coordinator.stop().await;
        assert_eq!(listener.registry().len(), 1);
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.sources_discovered, 1);
        assert_eq!(snap.duplicate_announcements, 1);
    }

    #[tokio::test]
    async fn test_broadcast_with_no_sensors_discovers_nothing() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;

        assert_quiet(&mut coordinator.events).await;

        let listener = coordinator.stop().await;
        assert!(listener.registry().is_empty());
        assert_eq!(listener.metrics().snapshot().announcements, 0);
    }

    #[tokio::test]
    async fn test_concurrent_announcements_register_each_source() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;

        tokio::join!(
            announce(&coordinator.broker, "a"),
            announce(&coordinator.broker, "b")
        );

        let mut discovered = HashSet::new();
        for _ in 0..2 {
            let event = next_event(&mut coordinator.events).await;
            assert_eq!(event.name(), DATA_SOURCE_DISCOVERED);
            discovered.insert(event.source().unwrap().to_string());
        }
        assert_eq!(discovered, HashSet::from(["a".to_string(), "b".to_string()]));

        let broker = coordinator.broker.clone();
        wait_until(|| broker.is_consumed("a") && broker.is_consumed("b")).await;
        let listener = coordinator.stop().await;
        assert_eq!(listener.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_sensor_answering_broadcast_is_discovered() {
        let broker = Arc::new(InMemoryBroker::new());
        // Sensor subscribes to discovery requests before the coordinator starts.
        broker.declare_fanout_exchange("SensorDiscovery").await.unwrap();
        let q = broker.declare_queue("").await.unwrap();
        broker.bind_queue(&q, "SensorDiscovery", "").await.unwrap();
        let mut requests = broker.consume(&q).await.unwrap();
        broker.declare_queue("temp1").await.unwrap();

        let sensor_broker = broker.clone();
        let sensor = tokio::spawn(async move {
            let request = requests.next().await.unwrap();
            assert!(request.body.is_empty());
            sensor_broker
                .publish(AMQ_FANOUT, "", b"temp1".to_vec())
                .await
                .unwrap();
        });

        let mut coordinator = Coordinator::start(broker).await;
        sensor.await.unwrap();

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.payload(), &EventPayload::Source(id("temp1")));
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_announcement_is_ignored() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;

        for body in [Vec::new(), vec![0xc3, 0x28], b"tab\there".to_vec()] {
            coordinator.broker.publish(AMQ_FANOUT, "", body).await.unwrap();
        }
        announce(&coordinator.broker, "valid").await;

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.source(), Some("valid"));

        let listener = coordinator.stop().await;
        assert_eq!(listener.registry().len(), 1);
        assert_eq!(listener.metrics().snapshot().invalid_announcements, 3);
    }

    #[tokio::test]
    async fn test_source_is_rediscovered_after_its_queue_goes_away() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        let broker = coordinator.broker.clone();

        announce(&broker, "temp1").await;
        let first = next_event(&mut coordinator.events).await;
        assert_eq!(first.name(), DATA_SOURCE_DISCOVERED);
        wait_until(|| broker.is_consumed("temp1")).await;

        // Sensor goes offline, then comes back and announces once.
        broker.delete_queue("temp1");
        announce(&broker, "temp1").await;

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.name(), DATA_SOURCE_DISCOVERED);
        wait_until(|| broker.is_consumed("temp1")).await;

        let listener = coordinator.stop().await;
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.sources_discovered, 2);
        assert_eq!(snap.sources_closed, 1);
    }

    #[tokio::test]
    async fn test_reconnect_during_backlog_drain_keeps_source() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        let broker = coordinator.broker.clone();

        announce(&broker, "temp1").await;
        next_event(&mut coordinator.events).await;
        wait_until(|| broker.is_consumed("temp1")).await;

        for i in 0..200 {
            send_reading(&broker, "temp1", &reading("temp1", f64::from(i))).await;
        }
        broker.delete_queue("temp1");
        announce(&broker, "temp1").await;
        send_reading(&broker, "temp1", &reading("temp1", -1.0)).await;

        // The reading sent after reconnecting arrives once the new listener runs.
        let mut rediscovered = false;
        loop {
            let event = next_event(&mut coordinator.events).await;
            if event.name() == DATA_SOURCE_DISCOVERED {
                rediscovered = true;
            } else if event.reading().unwrap().value() < 0.0 {
                break;
            }
        }
        assert!(rediscovered);

        let listener = coordinator.stop().await;
        assert!(listener.registry().contains(&id("temp1")));
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.sources_discovered, 2);
        assert_eq!(snap.sources_closed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_every_source_queue() {
        let coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        let broker = coordinator.broker.clone();

        for name in ["a", "b", "c"] {
            announce(&broker, name).await;
        }
        wait_until(|| ["a", "b", "c"].iter().all(|q| broker.is_consumed(q))).await;

        let listener = coordinator.stop().await;
        assert_eq!(listener.active_listeners(), 0);
        for name in ["a", "b", "c"] {
            assert!(!broker.is_consumed(name), "{name} still consumed");
        }
    }
}
