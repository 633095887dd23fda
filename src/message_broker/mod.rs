// region:    --- Imports
use crate::auction::events::AuctionEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Event Envelope
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Message written to the events topic
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventEnvelope {
    pub aggregate_id: i64,
    pub event_type: String,
    pub data: AuctionEvent,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: AuctionEvent) -> Self {
        Self {
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            data: event,
            timestamp: Utc::now(),
        }
    }
}
// endregion: --- Event Envelope

// region:    --- Event Publisher
/// Hands committed events to the notification collaborator
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AuctionEvent) -> Result<(), BrokerError>;
}

/// Publishes after commit. Failures are logged, the committed change stands.
pub async fn publish_all(publisher: &dyn EventPublisher, events: Vec<AuctionEvent>) {
    for event in events {
        let event_type = event.event_type();
        if let Err(e) = publisher.publish(event).await {
            error!(
                "{:<12} --> Event publish failed ({}): {}",
                "Publisher", event_type, e
            );
        }
    }
}

/// Kafka backed publisher
pub struct KafkaEventPublisher {
    producer: Arc<KafkaProducer>,
    topic: String,
}

impl KafkaEventPublisher {
    pub fn new(producer: Arc<KafkaProducer>, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: AuctionEvent) -> Result<(), BrokerError> {
        let envelope = EventEnvelope::new(event);
        let payload = serde_json::to_string(&envelope)?;
        self.producer
            .send_message(&self.topic, &envelope.aggregate_id.to_string(), &payload)
            .await
    }
}

/// Keeps published events in memory
#[derive(Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<AuctionEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuctionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: AuctionEvent) -> Result<(), BrokerError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
        Ok(())
    }
}
// endregion: --- Event Publisher

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
}

impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
        })
    }

    /// Sends one message
    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<(), BrokerError> {
        info!(
            "{:<12} --> Kafka message: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, Duration::from_secs(0))
            .await
            .map_err(|(e, _)| BrokerError::Kafka(e))?;

        Ok(())
    }
}

// endregion: --- Kafka Producer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    brokers: String,
}

impl KafkaManager {
    pub fn new(brokers: &str) -> Result<Self, BrokerError> {
        Ok(KafkaManager {
            producer: Arc::new(KafkaProducer::new(brokers)?),
            brokers: brokers.to_string(),
        })
    }

    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    /// Creates the topic, an already existing topic counts as success
    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), BrokerError> {
        info!("{:<12} --> Creating Kafka topic: {}", "Manager", topic_name);

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        let results = admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await?;
        for result in results {
            match result {
                Ok(topic) => info!("{:<12} --> Kafka topic ready: {}", "Manager", topic),
                Err((topic, rdkafka::types::RDKafkaErrorCode::TopicAlreadyExists)) => {
                    info!("{:<12} --> Kafka topic exists: {}", "Manager", topic)
                }
                Err((topic, code)) => {
                    error!(
                        "{:<12} --> Kafka topic creation failed: {} {:?}",
                        "Manager", topic, code
                    );
                    return Err(BrokerError::Kafka(KafkaError::AdminOp(code)));
                }
            }
        }
        Ok(())
    }
}

// endregion: --- Kafka Manager

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_keyed_by_auction() {
        let envelope = EventEnvelope::new(AuctionEvent::AuctionCancelled {
            auction_id: 9,
            cancelled_by: 2,
            timestamp: Utc::now(),
        });
        assert_eq!(envelope.aggregate_id, 9);
        assert_eq!(envelope.event_type, "AuctionCancelled");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["type"], "AuctionCancelled");
    }

    #[tokio::test]
    async fn in_memory_publisher_records_in_order() {
        let publisher = InMemoryEventPublisher::new();
        publish_all(
            &publisher,
            vec![
                AuctionEvent::ListingDeleted {
                    auction_id: 1,
                    item_id: 1,
                    timestamp: Utc::now(),
                },
                AuctionEvent::AuctionCancelled {
                    auction_id: 2,
                    cancelled_by: 3,
                    timestamp: Utc::now(),
                },
            ],
        )
        .await;
        let ids: Vec<i64> = publisher.events().iter().map(|e| e.aggregate_id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
