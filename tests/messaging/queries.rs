//! Query execution.

use std::sync::Arc;

use herald::{
    ConfigurationError, HandlerError, HandlerRegistry, IntegrationTypes, MessageDispatcher,
    MessagingConfig, MessagingError, MessagingService,
};
use tokio_util::sync::CancellationToken;

use crate::support::{service, OrderBook, OrderTotal, PlaceOrder};

fn registry(book: &Arc<OrderBook>) -> HandlerRegistry {
    HandlerRegistry::new()
        .register(MessageDispatcher::synchronous(book.clone(), "place", OrderBook::place))
        .register(MessageDispatcher::asynchronous(book.clone(), "total", OrderBook::total))
}

#[tokio::test]
async fn query_returns_answer() {
    let book = OrderBook::new();
    let service = service(registry(&book));
    let cancel = CancellationToken::new();

    let id = service.send(PlaceOrder::new("sku-1", 3), &cancel).await.unwrap();
    let total = service.execute_query(OrderTotal::new(&id), &cancel).await.unwrap();

    assert_eq!(total, 30);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let book = OrderBook::new();
    let err = service(registry(&book))
        .execute_query(OrderTotal::new("nope"), &CancellationToken::new())
        .await
        .unwrap_err();

    let faults = err.publisher_error().unwrap().handler_faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(
        faults[0].downcast_ref::<HandlerError>(),
        Some(HandlerError::NotFound(id)) if id == "nope"
    ));
}

#[tokio::test]
async fn query_without_handler_is_a_configuration_error() {
    let book = OrderBook::new();
    let registry = HandlerRegistry::new().register(MessageDispatcher::synchronous(
        book.clone(),
        "place",
        OrderBook::place,
    ));

    let err = service(registry)
        .execute_query(OrderTotal::new("o-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MessagingError::Configuration(ConfigurationError::HandlerCardinality { ref candidates, .. })
            if candidates.is_empty()
    ));
}

#[tokio::test]
async fn answering_the_same_query_twice_is_a_fault() {
    let book = OrderBook::new();
    let service = service(registry(&book));
    let cancel = CancellationToken::new();

    let id = service.send(PlaceOrder::new("sku-1", 1), &cancel).await.unwrap();
    let query = Arc::new(OrderTotal::new(&id));

    let first = service.execute_query::<OrderTotal>(query.clone(), &cancel).await.unwrap();
    assert_eq!(first, 10);

    let err = service
        .execute_query::<OrderTotal>(query.clone(), &cancel)
        .await
        .unwrap_err();
    let faults = err.publisher_error().unwrap().handler_faults();
    assert!(matches!(
        faults[0].downcast_ref::<HandlerError>(),
        Some(HandlerError::ResultAlreadySet(_))
    ));
    assert_eq!(query.total.get(), Some(&10));
}

#[tokio::test]
async fn queries_ignore_the_default_scope() {
    let book = OrderBook::new();
    let config = MessagingConfig {
        default_scope: IntegrationTypes::External,
        ..MessagingConfig::default()
    };
    let service = MessagingService::builder(config)
        .handlers(registry(&book))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();

    // commands honour the default scope, so placing has to name the internal one
    let id = service
        .send_scoped(PlaceOrder::new("sku-1", 2), IntegrationTypes::Internal, &cancel)
        .await
        .unwrap();
    let total = service.execute_query(OrderTotal::new(&id), &cancel).await.unwrap();

    assert_eq!(total, 20);
}
