use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{ResolveError, Stage};
use crate::call::CallContext;
use crate::providers::{Provider, operation};
use crate::resource::TargetGroup;

/// Largest target group batch sent in one describe request.
pub const MAX_TARGET_GROUPS_PER_CALL: usize = 20;

#[derive(Clone, Copy)]
pub struct TargetGroupResolver<'a> {
    provider: &'a dyn Provider,
    calls: &'a CallContext,
}

impl<'a> TargetGroupResolver<'a> {
    pub fn new(provider: &'a dyn Provider, calls: &'a CallContext) -> Self {
        Self { provider, calls }
    }

    /// Maps each target group to one load balancer.
    ///
    /// A target group reporting several load balancers resolves to the
    /// lexicographically smallest identifier. Target groups with none are
    /// left out.
    pub async fn resolve(
        &self,
        ids: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, String>, ResolveError> {
        let ids: Vec<String> = ids.iter().cloned().collect();
        let mut attached: BTreeMap<String, TargetGroup> = BTreeMap::new();

        for batch in ids.chunks(MAX_TARGET_GROUPS_PER_CALL) {
            let described = self
                .calls
                .drain_pages(operation::DESCRIBE_TARGET_GROUPS, |token| {
                    self.provider.describe_target_groups(batch, token)
                })
                .await
                .map_err(|e| ResolveError::new(Stage::TargetGroups, batch.join(","), e))?;

            for target_group in described {
                let merged = attached
                    .entry(target_group.id.clone())
                    .or_insert_with(|| TargetGroup {
                        id: target_group.id.clone(),
                        load_balancer_ids: BTreeSet::new(),
                    });
                merged.load_balancer_ids.extend(target_group.load_balancer_ids);
            }
        }

        let resolved: BTreeMap<String, String> = attached
            .values()
            .filter_map(|tg| {
                tg.primary_load_balancer()
                    .map(|lb| (tg.id.clone(), lb.to_string()))
            })
            .collect();

        debug!(
            requested = ids.len(),
            attached = resolved.len(),
            "target groups resolved to load balancers"
        );

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, TraceConfig};
    use crate::providers::fixture::{Fixture, FixtureProvider};
    use crate::resource::dedup;
    use tokio_util::sync::CancellationToken;

    fn calls() -> CallContext {
        let config = TraceConfig {
            retry: RetryPolicy::immediate(0),
            ..Default::default()
        };
        CallContext::new(&config, CancellationToken::new())
    }

    fn target_group(id: &str, lbs: &[&str]) -> TargetGroup {
        TargetGroup {
            id: id.to_string(),
            load_balancer_ids: dedup(lbs.iter().copied()),
        }
    }

    #[tokio::test]
    async fn test_resolve_omits_detached_target_groups() {
        let provider = FixtureProvider::new(Fixture {
            target_groups: vec![target_group("tg-1", &["lb-1"]), target_group("tg-2", &[])],
            ..Default::default()
        });
        let calls = calls();

        let resolved = TargetGroupResolver::new(&provider, &calls)
            .resolve(&dedup(["tg-1", "tg-2"]))
            .await
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["tg-1"], "lb-1");
    }

    #[tokio::test]
    async fn test_resolve_tie_break_is_smallest_identifier() {
        let fixture = Fixture {
            target_groups: vec![target_group("tg-1", &["lb-zeta", "lb-alpha", "lb-mu"])],
            ..Default::default()
        };

        for _ in 0..5 {
            let provider = FixtureProvider::new(fixture.clone());
            let calls = calls();
            let resolved = TargetGroupResolver::new(&provider, &calls)
                .resolve(&dedup(["tg-1"]))
                .await
                .unwrap();
            assert_eq!(resolved["tg-1"], "lb-alpha");
        }
    }

    #[tokio::test]
    async fn test_resolve_tie_break_spans_pages() {
        let provider = FixtureProvider::new(Fixture {
            target_groups: vec![target_group("tg-1", &["lb-b"]), target_group("tg-1", &["lb-a"])],
            ..Default::default()
        })
        .with_page_size(1);
        let calls = calls();

        let resolved = TargetGroupResolver::new(&provider, &calls)
            .resolve(&dedup(["tg-1"]))
            .await
            .unwrap();

        assert_eq!(resolved["tg-1"], "lb-a");
    }

    #[tokio::test]
    async fn test_resolve_empty_input() {
        let provider = FixtureProvider::new(Fixture::default());
        let calls = calls();

        let resolved = TargetGroupResolver::new(&provider, &calls)
            .resolve(&BTreeSet::new())
            .await
            .unwrap();

        assert!(resolved.is_empty());
        assert_eq!(provider.call_count(operation::DESCRIBE_TARGET_GROUPS), 0);
    }

    #[tokio::test]
    async fn test_resolve_chunks_batches() {
        let ids: Vec<String> = (0..MAX_TARGET_GROUPS_PER_CALL + 5)
            .map(|i| format!("tg-{i:02}"))
            .collect();
        let provider = FixtureProvider::new(Fixture {
            target_groups: ids.iter().map(|id| target_group(id, &["lb-1"])).collect(),
            ..Default::default()
        });
        let calls = calls();

        let resolved = TargetGroupResolver::new(&provider, &calls)
            .resolve(&dedup(ids.clone()))
            .await
            .unwrap();

        assert_eq!(resolved.len(), ids.len());
        assert_eq!(provider.call_count(operation::DESCRIBE_TARGET_GROUPS), 2);
    }
}
