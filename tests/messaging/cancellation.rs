//! Cancellation of in-flight publishes.

use std::sync::Arc;
use std::time::Duration;

use herald::{HandlerError, HandlerRegistry, MessageDispatcher, MessagingError};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::support::{service, Journal, OrderPlaced, PlaceOrder, LONG};

#[tokio::test]
async fn cancelled_before_publish_runs_nothing() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        journal.clone(),
        "record",
        |j: &Journal, _: &OrderPlaced| {
            j.record("ran");
            Ok(())
        },
    ));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let event = Arc::new(OrderPlaced::new("o-1", 10));
    let err = service(registry)
        .publish_event::<OrderPlaced>(event.clone(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(journal.is_empty());
    // enrichment never ran either
    assert!(event.attributes.message_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_returns_promptly_and_plain_handler_still_finishes() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::asynchronous(
        journal.clone(),
        "slow",
        |j: Arc<Journal>, _: Arc<OrderPlaced>| async move {
            sleep(LONG).await;
            j.record("finished");
            Ok::<_, HandlerError>(())
        },
    ));
    let service = service(registry);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = timeout(
        Duration::from_secs(5),
        service.publish_event(OrderPlaced::new("o-1", 10), &cancel),
    )
    .await
    .expect("publish should stop once cancelled");

    assert!(matches!(outcome, Err(MessagingError::Cancelled)));
    assert!(journal.is_empty());

    // the handler does not take the token, so it runs to completion
    sleep(LONG).await;
    assert_eq!(journal.entries(), ["finished"]);
}

#[tokio::test(start_paused = true)]
async fn cancellable_handler_is_cut_short() {
    let journal = Journal::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::cancellable(
        journal.clone(),
        "wait",
        |j: Arc<Journal>, _: Arc<PlaceOrder>, cancel: CancellationToken| async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    j.record("observed");
                    Err(HandlerError::Cancelled)
                }
                _ = sleep(LONG) => Ok(()),
            }
        },
    ));
    let service = service(registry);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = service
        .send_command(PlaceOrder::new("sku-1", 1), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());

    // the handler sees the token fire and stops without waiting out its sleep
    sleep(Duration::from_millis(1)).await;
    assert_eq!(journal.entries(), ["observed"]);
}
