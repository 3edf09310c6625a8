//! Enrichers and filters around publishing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use herald::well_known::{DATE_OCCURRED, HOST_ID, HOST_NAME, PRIORITY};
use herald::{
    ExpiryFilter, FilterStages, HandlerError, HandlerRegistry, Message, MessageDispatcher,
    MessageEnricher, MessageFilter, MessagingService, PipelineStage, TraceFilter,
};
use tokio_util::sync::CancellationToken;

use crate::support::{init_tracing, service, service_builder, test_config, Journal, OrderPlaced};

/// Handler that records every attribute it can see, as `name=value`.
fn attribute_recorder(journal: &Arc<Journal>) -> HandlerRegistry {
    HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "record",
        |j: &Journal, e: &OrderPlaced| {
            for (name, value) in e.attributes.to_map() {
                j.record(format!("{name}={value}"));
            }
            Ok(())
        },
    ))
}

fn seen<'a>(entries: &'a [String], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find_map(|e| e.strip_prefix(name)?.strip_prefix('='))
}

// ============================================================================
// Test 1: Default enrichers stamp the message before handlers see it
// ============================================================================

#[tokio::test]
async fn handlers_see_enriched_attributes() {
    init_tracing();
    let journal = Journal::new();
    let service = service(attribute_recorder(&journal));
    let host_id = service.config().host_id.clone();

    let event = Arc::new(OrderPlaced::new("o-1", 10));
    service
        .publish_event::<OrderPlaced>(event.clone(), &CancellationToken::new())
        .await
        .unwrap();

    let entries = journal.entries();
    let message_id = seen(&entries, "message-id").expect("message id");
    assert!(uuid::Uuid::parse_str(message_id).is_ok());
    assert_eq!(seen(&entries, "correlation-id"), Some(message_id));
    assert_eq!(seen(&entries, HOST_NAME), Some("test-host"));
    assert_eq!(seen(&entries, HOST_ID), Some(host_id.as_str()));
    assert!(seen(&entries, DATE_OCCURRED).is_some());

    // the caller's message carries the same attributes
    assert_eq!(event.attributes.message_id().as_deref(), Some(message_id));
    assert!(event.attributes.date_occurred().is_some());
}

#[tokio::test]
async fn caller_supplied_attributes_are_kept() {
    let journal = Journal::new();
    let service = service(attribute_recorder(&journal));

    let event = OrderPlaced::new("o-1", 10);
    event.attributes.set_message_id("m-1");
    event.attributes.set_correlation_id("saga-7");
    event.attributes.set(HOST_NAME, "origin-host");
    service.publish_event(event, &CancellationToken::new()).await.unwrap();

    let entries = journal.entries();
    assert_eq!(seen(&entries, "message-id"), Some("m-1"));
    assert_eq!(seen(&entries, "correlation-id"), Some("saga-7"));
    assert_eq!(seen(&entries, HOST_NAME), Some("origin-host"));
}

#[tokio::test]
async fn typed_attributes_round_trip_to_handlers() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "read",
        |j: &Journal, e: &OrderPlaced| {
            let lines: Vec<i64> = e.attributes.get("line-ids")?;
            let priority: u8 = e.attributes.get(PRIORITY)?;
            j.record(format!("{lines:?}/{priority}"));
            Ok(())
        },
    ));

    let event = OrderPlaced::new("o-1", 10);
    event.attributes.set("line-ids", vec![3_i64, -1, 42]);
    event.attributes.set_priority(7);
    service(registry)
        .publish_event(event, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(journal.entries(), ["[3, -1, 42]/7"]);
}

// ============================================================================
// Test 2: Custom enrichers and their failures
// ============================================================================

struct RouteByCustomer;

#[async_trait]
impl MessageEnricher for RouteByCustomer {
    fn name(&self) -> &str {
        "route-by-customer"
    }

    async fn enrich(&self, message: &dyn Message) -> Result<(), HandlerError> {
        if let Some(order) = message.as_any().downcast_ref::<OrderPlaced>() {
            message
                .attributes()
                .set_route_key(format!("orders.{}", order.order_id));
        }
        Ok(())
    }
}

struct BrokenEnricher;

#[async_trait]
impl MessageEnricher for BrokenEnricher {
    fn name(&self) -> &str {
        "broken"
    }

    async fn enrich(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        Err(HandlerError::other("clock unavailable"))
    }
}

#[tokio::test]
async fn custom_enricher_runs_before_handlers() {
    let journal = Journal::new();
    let service = service_builder(attribute_recorder(&journal))
        .add_enricher(RouteByCustomer)
        .build()
        .unwrap();

    service
        .publish_event(OrderPlaced::new("o-5", 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(seen(&journal.entries(), "route-key"), Some("orders.o-5"));
}

#[tokio::test]
async fn failing_enricher_stops_the_publish() {
    let journal = Journal::new();
    let service = MessagingService::builder(test_config())
        .add_enricher(RouteByCustomer)
        .add_enricher(BrokenEnricher)
        .handlers(attribute_recorder(&journal))
        .build()
        .unwrap();

    let err = service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(journal.is_empty());
    let aggregate = err.publisher_error().unwrap();
    assert_eq!(aggregate.stage(), PipelineStage::Enrich);
    assert_eq!(aggregate.faults().len(), 1);
    assert_eq!(aggregate.faults()[0].origin(), "broken");
}

// ============================================================================
// Test 3: Filters
// ============================================================================

#[derive(Default)]
struct Auditor {
    journal: Arc<Journal>,
}

#[async_trait]
impl MessageFilter for Auditor {
    fn name(&self) -> &str {
        "auditor"
    }

    fn stages(&self) -> FilterStages {
        FilterStages::BOTH
    }

    async fn on_pre_publish(&self, message: &dyn Message) -> Result<(), HandlerError> {
        self.journal.record(format!("pre:{}", message.message_type()));
        Ok(())
    }

    async fn on_post_publish(&self, message: &dyn Message) -> Result<(), HandlerError> {
        self.journal.record(format!("post:{}", message.message_type()));
        Ok(())
    }
}

#[tokio::test]
async fn filters_wrap_publishing() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "handle",
        |j: &Journal, _: &OrderPlaced| {
            j.record("handled");
            Ok(())
        },
    ));
    let service = service_builder(registry)
        .add_filter(Auditor {
            journal: journal.clone(),
        })
        .add_filter(TraceFilter::default())
        .build()
        .unwrap();

    service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        journal.entries_in_order(),
        ["pre:OrderPlaced", "handled", "post:OrderPlaced"]
    );
}

/// Enricher that notes when it starts.
struct Stamp {
    label: &'static str,
    journal: Arc<Journal>,
}

#[async_trait]
impl MessageEnricher for Stamp {
    fn name(&self) -> &str {
        self.label
    }

    async fn enrich(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        self.journal.record(format!("enrich:{}", self.label));
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Filter that notes when each of its hooks starts.
struct Gate {
    label: &'static str,
    journal: Arc<Journal>,
}

#[async_trait]
impl MessageFilter for Gate {
    fn name(&self) -> &str {
        self.label
    }

    fn stages(&self) -> FilterStages {
        FilterStages::BOTH
    }

    async fn on_pre_publish(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        self.journal.record(format!("pre:{}", self.label));
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn on_post_publish(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        self.journal.record(format!("post:{}", self.label));
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[tokio::test]
async fn stage_members_start_in_registration_order() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "handle",
        |j: &Journal, _: &OrderPlaced| {
            j.record("handled");
            Ok(())
        },
    ));
    let stamp = |label: &'static str| Stamp {
        label,
        journal: journal.clone(),
    };
    let gate = |label: &'static str| Gate {
        label,
        journal: journal.clone(),
    };
    let service = MessagingService::builder(test_config())
        .add_enricher(stamp("second"))
        .add_enricher(stamp("first"))
        .add_filter(gate("outer"))
        .add_filter(gate("inner"))
        .handlers(registry)
        .build()
        .unwrap();

    service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        journal.entries_in_order(),
        [
            "enrich:second",
            "enrich:first",
            "pre:outer",
            "pre:inner",
            "handled",
            "post:outer",
            "post:inner",
        ]
    );
}

#[tokio::test]
async fn expired_message_is_rejected_before_publishing() {
    let journal = Journal::new();
    let service = service_builder(attribute_recorder(&journal))
        .add_filter(ExpiryFilter)
        .build()
        .unwrap();

    let stale = OrderPlaced::new("o-1", 10);
    stale.attributes.set_expires_at(Utc::now() - ChronoDuration::minutes(5));
    let err = service
        .publish_event(stale, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(journal.is_empty());
    let aggregate = err.publisher_error().unwrap();
    assert_eq!(aggregate.stage(), PipelineStage::PreFilter);
    assert!(matches!(
        aggregate.faults()[0].downcast_ref::<HandlerError>(),
        Some(HandlerError::Rejected(_))
    ));

    let fresh = OrderPlaced::new("o-2", 10);
    fresh.attributes.set_expires_at(Utc::now() + ChronoDuration::minutes(5));
    service.publish_event(fresh, &CancellationToken::new()).await.unwrap();
    assert!(!journal.is_empty());
}
