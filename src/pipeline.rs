//! Drives the resolvers from project tags down to listener rules.
//!
//! Tags and groups are resolved once per run. Below that the work fans out
//! per group, per load balancer and per (target group, listener) pair with a
//! bounded number of lookups in flight. Branch failures are collected next to
//! the successful records instead of aborting the run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::call::CallContext;
use crate::config::TraceConfig;
use crate::matcher::StageMatcher;
use crate::providers::Provider;
use crate::resolvers::{
    GroupResolver, ListenerResolver, ResolveError, RuleResolver, TagResolver, TargetGroupResolver,
    canonicalize_failures,
};
use crate::resource::Correlation;

/// Outcome of one run. Records and failures are sorted.
#[derive(Debug, Clone)]
pub struct TraceReport {
    pub project: String,
    pub stage: String,
    /// Every matched autoscaling group with its attached target groups.
    pub groups: BTreeMap<String, BTreeSet<String>>,
    pub records: Vec<Correlation>,
    pub failures: Vec<ResolveError>,
}

impl TraceReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn records_for<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Correlation> {
        self.records.iter().filter(move |r| r.group_name == group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Branch {
    group: String,
    target_group: String,
    load_balancer: String,
}

pub struct Pipeline {
    provider: Arc<dyn Provider>,
    calls: CallContext,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn Provider>, config: &TraceConfig, cancel: CancellationToken) -> Self {
        Self {
            provider,
            calls: CallContext::new(config, cancel),
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Fails only when the run-wide tag or group lookup fails; everything
    /// below is reported per branch in [`TraceReport::failures`].
    pub async fn run(
        &self,
        project: &str,
        matcher: &StageMatcher,
    ) -> Result<TraceReport, ResolveError> {
        let provider = self.provider.as_ref();

        let group_names = TagResolver::new(provider, &self.calls)
            .resolve(project, matcher)
            .await?;

        info!(
            project,
            stage = matcher.as_str(),
            mode = %matcher.mode(),
            count = group_names.len(),
            "autoscaling groups matched"
        );

        let groups = GroupResolver::new(provider, &self.calls)
            .resolve(&group_names)
            .await?;

        let mut failures = Vec::new();

        let branches = self.resolve_branches(&groups, &mut failures).await;
        info!(count = branches.len(), "target groups attached to load balancers");

        let listeners = self.resolve_listeners(&branches, &mut failures).await;

        let records = self
            .resolve_records(&branches, &listeners, &mut failures)
            .await;

        canonicalize_failures(&mut failures);

        info!(
            records = records.len(),
            failures = failures.len(),
            "trace complete"
        );

        Ok(TraceReport {
            project: project.to_string(),
            stage: matcher.as_str().to_string(),
            groups,
            records,
            failures,
        })
    }

    async fn resolve_branches(
        &self,
        groups: &BTreeMap<String, BTreeSet<String>>,
        failures: &mut Vec<ResolveError>,
    ) -> BTreeSet<Branch> {
        let resolver = TargetGroupResolver::new(self.provider.as_ref(), &self.calls);

        let results: Vec<_> = stream::iter(groups)
            .map(|(group, target_groups)| async move {
                (group, resolver.resolve(target_groups).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut branches = BTreeSet::new();
        for (group, result) in results {
            match result {
                Ok(resolved) => {
                    branches.extend(resolved.into_iter().map(|(target_group, load_balancer)| {
                        Branch {
                            group: group.clone(),
                            target_group,
                            load_balancer,
                        }
                    }));
                }
                Err(e) => {
                    warn!(group = %group, error = %e, "target group lookup failed");
                    failures.push(e.in_branch(group, None));
                }
            }
        }
        branches
    }

    // Each distinct load balancer is described once, however many branches share it.
    async fn resolve_listeners<'b>(
        &self,
        branches: &'b BTreeSet<Branch>,
        failures: &mut Vec<ResolveError>,
    ) -> BTreeMap<&'b str, BTreeSet<String>> {
        let resolver = ListenerResolver::new(self.provider.as_ref(), &self.calls);
        let load_balancers: BTreeSet<&str> =
            branches.iter().map(|b| b.load_balancer.as_str()).collect();

        let results: Vec<_> = stream::iter(load_balancers)
            .map(|lb| async move { (lb, resolver.resolve(lb).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut listeners = BTreeMap::new();
        for (lb, result) in results {
            match result {
                Ok(ids) => {
                    if ids.is_empty() {
                        info!(load_balancer = lb, "load balancer has no listeners");
                    }
                    listeners.insert(lb, ids);
                }
                Err(e) => {
                    warn!(load_balancer = lb, error = %e, "listener lookup failed");
                    failures.push(e);
                }
            }
        }
        listeners
    }

    async fn resolve_records(
        &self,
        branches: &BTreeSet<Branch>,
        listeners: &BTreeMap<&str, BTreeSet<String>>,
        failures: &mut Vec<ResolveError>,
    ) -> Vec<Correlation> {
        let resolver = RuleResolver::new(self.provider.as_ref(), &self.calls);

        let checks: Vec<(&Branch, &str)> = branches
            .iter()
            .flat_map(|branch| {
                listeners
                    .get(branch.load_balancer.as_str())
                    .into_iter()
                    .flatten()
                    .map(move |listener| (branch, listener.as_str()))
            })
            .collect();

        let results: Vec<_> = stream::iter(checks)
            .map(|(branch, listener)| async move {
                (
                    branch,
                    resolver.resolve(listener, &branch.target_group).await,
                )
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut records = BTreeSet::new();
        for (branch, result) in results {
            match result {
                Ok(found) => records.extend(found.into_iter().map(|listener| {
                    Correlation::new(&branch.group, &branch.target_group, listener)
                })),
                Err(e) => {
                    warn!(
                        group = %branch.group,
                        target_group = %branch.target_group,
                        error = %e,
                        "rule lookup failed"
                    );
                    failures.push(
                        e.in_branch(&branch.group, Some(branch.target_group.clone())),
                    );
                }
            }
        }
        records.into_iter().collect()
    }
}
