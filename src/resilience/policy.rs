use std::any::{self, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::publisher::{MessagePublisher, PublishError};

/// One delivery attempt. A policy may call it any number of times.
pub type Attempt<'a> = Box<dyn FnMut() -> BoxFuture<'a, Result<(), PublishError>> + Send + 'a>;

/// Strategy wrapped around a publisher's delivery call.
///
/// The pipeline treats policies as opaque: it hands over the attempt and
/// awaits the outcome. Policies must stop when `cancel` fires.
pub trait ResiliencePolicy: Send + Sync + 'static {
    fn name(&self) -> &str {
        any::type_name::<Self>()
    }

    fn execute<'a>(
        &'a self,
        attempt: Attempt<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), PublishError>>;
}

/// Resolves the policy for a publisher's concrete type.
pub trait PolicyLookup: Send + Sync {
    fn policy_for(&self, publisher: TypeId) -> Option<Arc<dyn ResiliencePolicy>>;
}

/// Policies keyed by publisher type.
///
/// ```ignore
/// let policies = ResiliencePolicies::new()
///     .with::<QueuePublisher>(RetryPolicy::default());
/// ```
#[derive(Clone, Default)]
pub struct ResiliencePolicies {
    by_publisher: HashMap<TypeId, Arc<dyn ResiliencePolicy>>,
}

impl ResiliencePolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `policy` to every publisher of type `P`.
    pub fn with<P: MessagePublisher>(mut self, policy: impl ResiliencePolicy) -> Self {
        self.insert::<P>(Arc::new(policy));
        self
    }

    pub fn insert<P: MessagePublisher>(&mut self, policy: Arc<dyn ResiliencePolicy>) {
        self.by_publisher.insert(TypeId::of::<P>(), policy);
    }

    pub fn len(&self) -> usize {
        self.by_publisher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_publisher.is_empty()
    }
}

impl PolicyLookup for ResiliencePolicies {
    fn policy_for(&self, publisher: TypeId) -> Option<Arc<dyn ResiliencePolicy>> {
        self.by_publisher.get(&publisher).cloned()
    }
}

impl fmt::Debug for ResiliencePolicies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.by_publisher.values().map(|p| p.name()))
            .finish()
    }
}
