//! # Runtime Flows
//!
//! The full coordinator runtime with simulated sensors: configuration →
//! startup → discovery of every sensor → readings on the bus → shutdown.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use coordinator_runtime::{CoordinatorConfig, CoordinatorRuntime};
    use shared_bus::{EventFilter, EventTopic};
    use tokio::time::timeout;

    use crate::integration::fixtures::{next_event, EVENT_TIMEOUT};

    fn config_from(vars: &[(&str, &str)]) -> CoordinatorConfig {
        let config = CoordinatorConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();
        config.validate().unwrap();
        config
    }

    #[tokio::test]
    async fn test_every_configured_sensor_is_ingested() {
        let config = config_from(&[
            ("COORD_SENSORS", "temp1,temp2,humidity"),
            ("COORD_SENSOR_INTERVAL_MS", "10"),
            ("COORD_SHUTDOWN_GRACE_MS", "200"),
        ]);
        let runtime = CoordinatorRuntime::new(config);
        let cancel = runtime.cancel_token();
        let mut readings = runtime
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Readings]));

        let run = tokio::spawn(runtime.run());

        let mut seen = HashSet::new();
        while seen.len() < 3 {
            let event = next_event(&mut readings).await;
            let reading = event.reading().unwrap();
            // Simulated sensors name their readings after their queue.
            assert_eq!(Some(reading.name()), event.source());
            seen.insert(event.name().to_string());
        }

        cancel.cancel();
        let summary = timeout(EVENT_TIMEOUT, run).await.unwrap().unwrap().unwrap();
        assert_eq!(summary.metrics.sources_discovered, 3);
        assert_eq!(summary.metrics.invalid_announcements, 0);
        assert_eq!(summary.metrics.decode_failures, 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_readings() {
        let config = config_from(&[
            ("COORD_SENSORS", "temp1"),
            ("COORD_SENSOR_INTERVAL_MS", "5"),
        ]);
        let runtime = CoordinatorRuntime::new(config);
        let cancel = runtime.cancel_token();
        let bus = runtime.bus();
        let mut readings = bus.subscribe(EventFilter::topics(vec![EventTopic::Readings]));

        let run = tokio::spawn(runtime.run());
        next_event(&mut readings).await;

        cancel.cancel();
        timeout(EVENT_TIMEOUT, run).await.unwrap().unwrap().unwrap();

        // Drain what was published before shutdown, then expect silence.
        while readings.try_recv().is_some() {}
        let published = bus.events_published();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bus.events_published(), published);
    }
}
