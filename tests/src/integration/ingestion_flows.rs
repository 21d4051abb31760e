//! # Ingestion Flows
//!
//! Per-source consumption end to end: sensor queue → source listener →
//! decoder → `MessageReceived_<source>` on the event bus.
//!
//! ## Covered
//!
//! 1. A well-formed reading is republished unchanged under its source's name
//! 2. Malformed payloads are skipped without stopping the listener
//! 3. A source that only ever sends garbage yields its discovery event only
//! 4. Readings never leak across sources
//! 5. Per-source receipt order is preserved

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sensor_discovery::testing::wait_until;
    use sensor_discovery::{BrokerChannel, InMemoryBroker, DEFAULT_MAX_PAYLOAD_BYTES};
    use shared_bus::{EventFilter, EventPayload, EventTopic, DATA_SOURCE_DISCOVERED};

    use crate::integration::fixtures::{
        announce, assert_quiet, next_event, reading, send_raw, send_reading, Coordinator,
    };

    /// Announce a source and wait until its listener owns the queue.
    async fn discover(coordinator: &mut Coordinator, name: &str) {
        announce(&coordinator.broker, name).await;
        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.name(), DATA_SOURCE_DISCOVERED);
        let broker = coordinator.broker.clone();
        wait_until(|| broker.is_consumed(name)).await;
    }

    #[tokio::test]
    async fn test_reading_is_republished_under_source_name() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        discover(&mut coordinator, "temp1").await;

        let sent = reading("temp1", 21.5);
        send_reading(&coordinator.broker, "temp1", &sent).await;

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.name(), "MessageReceived_temp1");
        assert_eq!(event.payload(), &EventPayload::Reading(sent));
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_stop_listener() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        discover(&mut coordinator, "temp1").await;
        let broker = coordinator.broker.clone();

        send_raw(&broker, "temp1", vec![1, 2, 3]).await;
        send_raw(&broker, "temp1", vec![0; DEFAULT_MAX_PAYLOAD_BYTES + 1]).await;
        send_reading(&broker, "temp1", &reading("temp1", 22.0)).await;

        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.name(), "MessageReceived_temp1");
        assert_eq!(event.reading().unwrap().value(), 22.0);

        let listener = coordinator.stop().await;
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.decode_failures, 2);
        assert_eq!(snap.readings_published, 1);
    }

    #[tokio::test]
    async fn test_source_sending_only_garbage_yields_discovery_only() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        discover(&mut coordinator, "noisy").await;

        for body in [vec![0xff], Vec::new(), b"not a reading".to_vec()] {
            send_raw(&coordinator.broker, "noisy", body).await;
        }
        assert_quiet(&mut coordinator.events).await;

        let listener = coordinator.stop().await;
        assert_eq!(listener.metrics().snapshot().decode_failures, 3);
    }

    #[tokio::test]
    async fn test_readings_do_not_leak_across_sources() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        discover(&mut coordinator, "a").await;
        discover(&mut coordinator, "b").await;
        let mut readings = coordinator
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Readings]));

        // Payload claims to be "b" but arrives on a's queue.
        send_reading(&coordinator.broker, "a", &reading("b", 1.0)).await;
        send_reading(&coordinator.broker, "a", &reading("a", 2.0)).await;

        for _ in 0..2 {
            assert_eq!(next_event(&mut readings).await.name(), "MessageReceived_a");
        }
        assert_quiet(&mut readings).await;
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_per_source_order_is_preserved() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        discover(&mut coordinator, "temp1").await;

        for i in 0..50 {
            send_reading(&coordinator.broker, "temp1", &reading("temp1", f64::from(i))).await;
        }

        for i in 0..50 {
            let event = next_event(&mut coordinator.events).await;
            assert_eq!(event.reading().unwrap().value(), f64::from(i));
        }
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_backlog_sent_before_discovery_is_delivered() {
        let mut coordinator = Coordinator::start(Arc::new(InMemoryBroker::new())).await;
        let broker = coordinator.broker.clone();

        broker.declare_queue("early").await.unwrap();
        send_reading(&broker, "early", &reading("early", 5.0)).await;
        announce(&broker, "early").await;

        assert_eq!(
            next_event(&mut coordinator.events).await.name(),
            DATA_SOURCE_DISCOVERED
        );
        let event = next_event(&mut coordinator.events).await;
        assert_eq!(event.reading().unwrap().value(), 5.0);
        coordinator.stop().await;
    }
}
