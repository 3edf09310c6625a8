//! Resilience policies around publishers.

use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use herald::{
    Attempt, HandlerRegistry, IntegrationTypes, MessageDispatcher, MessagePublisher, MessageRef,
    MessagingService, PipelineStage, PolicyLookup, PublishError, ResiliencePolicy,
};
use tokio_util::sync::CancellationToken;

use crate::support::{fast_retry_config, service_builder, FlakyPublisher, Journal, OrderPlaced};

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let flaky = FlakyPublisher::failing(2);
    let service = MessagingService::builder(fast_retry_config(3))
        .add_shared_publisher(flaky.clone())
        .retry::<FlakyPublisher>()
        .build()
        .unwrap();

    service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(flaky.attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn retries_give_up_after_the_limit() {
    let flaky = FlakyPublisher::failing(10);
    let service = MessagingService::builder(fast_retry_config(2))
        .add_shared_publisher(flaky.clone())
        .retry::<FlakyPublisher>()
        .build()
        .unwrap();

    let err = service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(flaky.attempts(), 3);
    let faults = err.publisher_error().unwrap().handler_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].origin(), "flaky");
    assert!(matches!(
        faults[0].downcast_ref::<PublishError>(),
        Some(PublishError::ConnectionFailed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn permanent_failures_are_not_retried() {
    let flaky = FlakyPublisher::rejecting();
    let service = MessagingService::builder(fast_retry_config(5))
        .add_shared_publisher(flaky.clone())
        .retry::<FlakyPublisher>()
        .build()
        .unwrap();

    let err = service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(flaky.attempts(), 1);
    assert!(err.to_string().contains("schema mismatch"));
}

#[tokio::test]
async fn publishers_without_policy_run_once() {
    let flaky = FlakyPublisher::failing(1);
    let service = MessagingService::builder(fast_retry_config(3))
        .add_shared_publisher(flaky.clone())
        .handlers(HandlerRegistry::new())
        .build()
        .unwrap();

    let err = service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(flaky.attempts(), 1);
    assert_eq!(err.publisher_error().unwrap().faults().len(), 1);
}

/// Counts how often it wraps a publish, and runs it once.
#[derive(Default)]
struct CountingPolicy {
    wrapped: AtomicUsize,
}

impl ResiliencePolicy for CountingPolicy {
    fn name(&self) -> &str {
        "counting"
    }

    fn execute<'a>(
        &'a self,
        mut attempt: Attempt<'a>,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        attempt()
    }
}

struct OnlyFlaky(Arc<CountingPolicy>);

impl PolicyLookup for OnlyFlaky {
    fn policy_for(&self, publisher: TypeId) -> Option<Arc<dyn ResiliencePolicy>> {
        (publisher == TypeId::of::<FlakyPublisher>()).then(|| self.0.clone() as Arc<dyn ResiliencePolicy>)
    }
}

#[tokio::test]
async fn policy_lookup_is_consulted_per_publisher() {
    let policy = Arc::new(CountingPolicy::default());
    let flaky = FlakyPublisher::failing(0);
    let service = MessagingService::builder(fast_retry_config(3))
        .handlers(HandlerRegistry::new())
        .add_shared_publisher(flaky.clone())
        .policy_lookup(OnlyFlaky(policy.clone()))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    service.publish_event(OrderPlaced::new("o-1", 10), &cancel).await.unwrap();
    service.publish_event(OrderPlaced::new("o-2", 10), &cancel).await.unwrap();

    assert_eq!(policy.wrapped.load(Ordering::SeqCst), 2);
    assert_eq!(flaky.attempts(), 2);
}

/// Broker client with a bug: every publish panics.
struct PanickingPublisher {
    attempts: AtomicUsize,
}

#[async_trait]
impl MessagePublisher for PanickingPublisher {
    fn name(&self) -> &str {
        "broken-broker"
    }

    fn integration_type(&self) -> IntegrationTypes {
        IntegrationTypes::External
    }

    async fn publish(&self, _message: &MessageRef, _cancel: &CancellationToken) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("broker client bug");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_publisher_becomes_a_named_fault() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "record",
        |j: &Journal, e: &OrderPlaced| {
            j.record(e.order_id.clone());
            Ok(())
        },
    ));
    let broken = Arc::new(PanickingPublisher {
        attempts: AtomicUsize::new(0),
    });
    let service = service_builder(registry)
        .add_shared_publisher(broken.clone())
        .retry::<PanickingPublisher>()
        .build()
        .unwrap();

    let err = service
        .publish_event(OrderPlaced::new("o-1", 10), &CancellationToken::new())
        .await
        .unwrap_err();

    // the other publisher still delivered, and a panic is never retried
    assert_eq!(journal.entries(), ["o-1"]);
    assert_eq!(broken.attempts.load(Ordering::SeqCst), 1);

    let aggregate = err.publisher_error().unwrap();
    assert_eq!(aggregate.stage(), PipelineStage::Publish);
    let faults = aggregate.handler_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].origin(), "broken-broker");
    assert!(matches!(
        faults[0].downcast_ref::<PublishError>(),
        Some(PublishError::Panicked(reason)) if reason == "broker client bug"
    ));
}
