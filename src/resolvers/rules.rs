use std::collections::BTreeSet;

use tracing::debug;

use super::{ResolveError, Stage};
use crate::call::CallContext;
use crate::providers::{Provider, operation};

#[derive(Clone, Copy)]
pub struct RuleResolver<'a> {
    provider: &'a dyn Provider,
    calls: &'a CallContext,
}

impl<'a> RuleResolver<'a> {
    pub fn new(provider: &'a dyn Provider, calls: &'a CallContext) -> Self {
        Self { provider, calls }
    }

    /// `{listener_id}` when any of the listener's rules forwards to
    /// `target_group_id`, otherwise empty.
    pub async fn resolve(
        &self,
        listener_id: &str,
        target_group_id: &str,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let matching = self.matching_rules(listener_id, target_group_id).await?;

        if matching.is_empty() {
            return Ok(BTreeSet::new());
        }

        debug!(
            listener = listener_id,
            target_group = target_group_id,
            rules = ?matching,
            "listener forwards to target group"
        );

        Ok(BTreeSet::from([listener_id.to_string()]))
    }

    /// Identifiers of the listener's rules that forward to `target_group_id`.
    pub async fn matching_rules(
        &self,
        listener_id: &str,
        target_group_id: &str,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let rules = self
            .calls
            .drain_pages(operation::DESCRIBE_RULES, |token| {
                self.provider.describe_rules(listener_id, token)
            })
            .await
            .map_err(|e| ResolveError::new(Stage::Rules, listener_id, e))?;

        Ok(rules
            .into_iter()
            .filter(|rule| rule.forwards_to(target_group_id))
            .map(|rule| rule.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, TraceConfig};
    use crate::providers::fixture::{Fixture, FixtureProvider};
    use crate::resource::{Listener, Rule, dedup};
    use tokio_util::sync::CancellationToken;

    fn calls() -> CallContext {
        let config = TraceConfig {
            retry: RetryPolicy::immediate(0),
            ..Default::default()
        };
        CallContext::new(&config, CancellationToken::new())
    }

    fn rule(id: &str, targets: &[&str]) -> Rule {
        Rule {
            id: id.to_string(),
            forward_targets: dedup(targets.iter().copied()),
        }
    }

    fn provider() -> FixtureProvider {
        FixtureProvider::new(Fixture {
            listeners: vec![
                Listener {
                    id: "lst-1".to_string(),
                    load_balancer_id: "lb-1".to_string(),
                    rules: vec![
                        rule("default", &[]),
                        rule("r-api", &["tg-1"]),
                        rule("r-weighted", &["tg-1", "tg-2"]),
                    ],
                },
                Listener {
                    id: "lst-2".to_string(),
                    load_balancer_id: "lb-1".to_string(),
                    rules: vec![rule("r-other", &["tg-10"])],
                },
            ],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_resolve_match_returns_singleton() {
        let provider = provider();
        let calls = calls();

        let found = RuleResolver::new(&provider, &calls)
            .resolve("lst-1", "tg-1")
            .await
            .unwrap();

        assert_eq!(found, dedup(["lst-1"]));
    }

    #[tokio::test]
    async fn test_resolve_requires_exact_match() {
        let provider = provider();
        let calls = calls();

        let found = RuleResolver::new(&provider, &calls)
            .resolve("lst-2", "tg-1")
            .await
            .unwrap();

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_matching_rules_lists_every_forwarding_rule() {
        let provider = provider();
        let calls = calls();

        let rules = RuleResolver::new(&provider, &calls)
            .matching_rules("lst-1", "tg-1")
            .await
            .unwrap();

        assert_eq!(rules, dedup(["r-api", "r-weighted"]));
    }

    #[tokio::test]
    async fn test_matching_rules_drains_every_page() {
        let provider = provider().with_page_size(1);
        let calls = calls();

        let rules = RuleResolver::new(&provider, &calls)
            .matching_rules("lst-1", "tg-2")
            .await
            .unwrap();

        assert_eq!(rules, dedup(["r-weighted"]));
        assert_eq!(provider.call_count(operation::DESCRIBE_RULES), 3);
    }

    #[tokio::test]
    async fn test_resolve_unknown_listener_is_failure() {
        let provider = provider();
        let calls = calls();

        let err = RuleResolver::new(&provider, &calls)
            .resolve("lst-404", "tg-1")
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Rules);
        assert_eq!(err.identifier, "lst-404");
    }
}
