//! Event fan-out.

use std::sync::Arc;

use herald::{HandlerError, HandlerRegistry, MessageDispatcher, MessagingError, PipelineStage};
use tokio_util::sync::CancellationToken;

use crate::support::{service, Journal, OrderPlaced, PriorityOrderPlaced};

// ============================================================================
// Test 1: Every handler of an event runs
// ============================================================================

#[tokio::test]
async fn event_reaches_every_handler() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new()
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "billing",
            |j: &Journal, e: &OrderPlaced| {
                j.record(format!("billing:{}", e.order_id));
                Ok(())
            },
        ))
        .register(MessageDispatcher::asynchronous(
            journal.clone(),
            "shipping",
            |j: Arc<Journal>, e: Arc<OrderPlaced>| async move {
                tokio::task::yield_now().await;
                j.record(format!("shipping:{}", e.order_id));
                Ok::<_, HandlerError>(())
            },
        ));

    service(registry)
        .publish_event(OrderPlaced::new("o-1", 30), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(journal.entries(), ["billing:o-1", "shipping:o-1"]);
}

#[tokio::test]
async fn event_without_handlers_is_delivered_nowhere() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "on_priority",
        |j: &Journal, _: &PriorityOrderPlaced| {
            j.record("priority");
            Ok(())
        },
    ));

    service(registry)
        .publish_event(OrderPlaced::new("o-1", 30), &CancellationToken::new())
        .await
        .unwrap();

    assert!(journal.is_empty());
}

// ============================================================================
// Test 2: Derived events reach base handlers only when they opt in
// ============================================================================

#[tokio::test]
async fn derived_event_reaches_opted_in_base_handlers() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new()
        .register(
            MessageDispatcher::synchronous(journal.clone(), "audit", |j: &Journal, e: &OrderPlaced| {
                j.record(format!("audit:{}", e.order_id));
                Ok(())
            })
            .include_derived(),
        )
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "exact",
            |j: &Journal, _: &OrderPlaced| {
                j.record("exact");
                Ok(())
            },
        ))
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "priority",
            |j: &Journal, e: &PriorityOrderPlaced| {
                j.record(format!("priority:{}", e.tier));
                Ok(())
            },
        ));

    service(registry)
        .publish_event(PriorityOrderPlaced::new("o-7", 90, 2), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(journal.entries(), ["audit:o-7", "priority:2"]);
}

#[tokio::test]
async fn base_handler_sees_attributes_of_derived_event() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(
        MessageDispatcher::synchronous(journal.clone(), "audit", |j: &Journal, e: &OrderPlaced| {
            j.record(e.attributes.route_key().unwrap_or_default());
            Ok(())
        })
        .include_derived(),
    );

    let event = PriorityOrderPlaced::new("o-7", 90, 2);
    herald::Message::attributes(&event).set_route_key("orders.priority");

    service(registry)
        .publish_event(event, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(journal.entries(), ["orders.priority"]);
}

// ============================================================================
// Test 3: Predicates narrow what a handler receives
// ============================================================================

#[tokio::test]
async fn predicate_filters_events() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(
        MessageDispatcher::synchronous(journal.clone(), "large", |j: &Journal, e: &OrderPlaced| {
            j.record(e.order_id.clone());
            Ok(())
        })
        .when(|e: &OrderPlaced| e.total >= 100),
    );
    let service = service(registry);
    let cancel = CancellationToken::new();

    service.publish_event(OrderPlaced::new("small", 5), &cancel).await.unwrap();
    service.publish_event(OrderPlaced::new("large", 500), &cancel).await.unwrap();

    assert_eq!(journal.entries(), ["large"]);
}

// ============================================================================
// Test 4: Failing handlers are aggregated, the rest still run
// ============================================================================

#[tokio::test]
async fn failing_handlers_are_reported_together() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new()
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "billing",
            |_: &Journal, _: &OrderPlaced| Err::<(), _>(HandlerError::Rejected("card declined".into())),
        ))
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "shipping",
            |j: &Journal, e: &OrderPlaced| {
                j.record(format!("shipped:{}", e.order_id));
                Ok(())
            },
        ))
        .register(MessageDispatcher::asynchronous(
            journal.clone(),
            "loyalty",
            |_: Arc<Journal>, _: Arc<OrderPlaced>| async move {
                Err::<(), _>(HandlerError::other("points service down"))
            },
        ));

    let err = service(registry)
        .publish_event(OrderPlaced::new("o-3", 30), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(journal.entries(), ["shipped:o-3"]);

    let aggregate = err.publisher_error().expect("publisher aggregate");
    assert_eq!(aggregate.stage(), PipelineStage::Publish);
    let faults = aggregate.handler_faults();
    assert_eq!(faults.len(), 2);

    let mut origins: Vec<_> = faults.iter().map(|f| f.origin().to_string()).collect();
    origins.sort();
    assert_eq!(origins, ["Journal::billing(OrderPlaced)", "Journal::loyalty(OrderPlaced)"]);

    let billing = faults
        .iter()
        .find(|f| f.origin().contains("billing"))
        .and_then(|f| f.downcast_ref::<HandlerError>())
        .unwrap();
    assert!(matches!(billing, HandlerError::Rejected(reason) if reason == "card declined"));
}

#[tokio::test]
async fn panicking_handler_becomes_a_fault() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new()
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "explode",
            |_: &Journal, _: &OrderPlaced| -> Result<(), HandlerError> { panic!("boom") },
        ))
        .register(MessageDispatcher::synchronous(
            journal.clone(),
            "record",
            |j: &Journal, _: &OrderPlaced| {
                j.record("recorded");
                Ok(())
            },
        ));

    let err = service(registry)
        .publish_event(OrderPlaced::new("o-4", 1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(journal.entries(), ["recorded"]);
    let MessagingError::Publisher(aggregate) = err else {
        panic!("expected a publisher aggregate, got {err:?}");
    };
    let faults = aggregate.handler_faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(
        faults[0].downcast_ref::<HandlerError>(),
        Some(HandlerError::Panicked(msg)) if msg == "boom"
    ));
}
