use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{ResolveError, Stage};
use crate::call::CallContext;
use crate::providers::{Provider, operation};

/// Largest name batch sent in one describe request.
pub const MAX_GROUP_NAMES_PER_CALL: usize = 50;

#[derive(Clone, Copy)]
pub struct GroupResolver<'a> {
    provider: &'a dyn Provider,
    calls: &'a CallContext,
}

impl<'a> GroupResolver<'a> {
    pub fn new(provider: &'a dyn Provider, calls: &'a CallContext) -> Self {
        Self { provider, calls }
    }

    /// Maps each named group to its attached target groups. Groups without
    /// attachments are kept with an empty set.
    pub async fn resolve(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, BTreeSet<String>>, ResolveError> {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        // NOTE: an empty name list would describe every group in the account
        if names.is_empty() {
            return Ok(groups);
        }

        let names: Vec<String> = names.iter().cloned().collect();

        for batch in names.chunks(MAX_GROUP_NAMES_PER_CALL) {
            let described = self
                .calls
                .drain_pages(operation::DESCRIBE_AUTO_SCALING_GROUPS, |token| {
                    self.provider.describe_auto_scaling_groups(batch, token)
                })
                .await
                .map_err(|e| ResolveError::new(Stage::Groups, batch.join(","), e))?;

            for group in described {
                groups
                    .entry(group.name)
                    .or_default()
                    .extend(group.target_group_ids);
            }
        }

        debug!(
            requested = names.len(),
            described = groups.len(),
            "autoscaling groups described"
        );

        Ok(groups)
    }
}
