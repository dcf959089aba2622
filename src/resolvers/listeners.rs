use std::collections::BTreeSet;

use super::{ResolveError, Stage};
use crate::call::CallContext;
use crate::providers::{Provider, operation};

#[derive(Clone, Copy)]
pub struct ListenerResolver<'a> {
    provider: &'a dyn Provider,
    calls: &'a CallContext,
}

impl<'a> ListenerResolver<'a> {
    pub fn new(provider: &'a dyn Provider, calls: &'a CallContext) -> Self {
        Self { provider, calls }
    }

    /// Listener identifiers of one load balancer. Empty when none are configured.
    pub async fn resolve(&self, load_balancer_id: &str) -> Result<BTreeSet<String>, ResolveError> {
        let listeners = self
            .calls
            .drain_pages(operation::DESCRIBE_LISTENERS, |token| {
                self.provider.describe_listeners(load_balancer_id, token)
            })
            .await
            .map_err(|e| ResolveError::new(Stage::Listeners, load_balancer_id, e))?;

        Ok(listeners.into_iter().map(|l| l.id).collect())
    }
}
