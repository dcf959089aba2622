//! The five correlation hops, from project tags down to listener rules.

mod groups;
mod listeners;
mod rules;
mod tags;
mod target_groups;

pub use groups::{GroupResolver, MAX_GROUP_NAMES_PER_CALL};
pub use listeners::ListenerResolver;
pub use rules::RuleResolver;
pub use tags::TagResolver;
pub use target_groups::{MAX_TARGET_GROUPS_PER_CALL, TargetGroupResolver};

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::providers::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Tags,
    Groups,
    TargetGroups,
    Listeners,
    Rules,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Tags => "tag",
            Stage::Groups => "autoscaling group",
            Stage::TargetGroups => "target group",
            Stage::Listeners => "listener",
            Stage::Rules => "rule",
        };
        f.write_str(name)
    }
}

/// The autoscaling group and target group a failed lookup was made for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BranchScope {
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_group: Option<String>,
}

impl fmt::Display for BranchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group '{}'", self.group)?;
        if let Some(target_group) = &self.target_group {
            write!(f, ", target group '{target_group}'")?;
        }
        Ok(())
    }
}

fn scope_suffix(branch: &Option<BranchScope>) -> String {
    branch
        .as_ref()
        .map(|b| format!(" ({b})"))
        .unwrap_or_default()
}

/// A resolver could not complete for one input identifier.
#[derive(Debug, Clone, Error)]
#[error("{stage} resolution failed for '{identifier}'{}: {source}", scope_suffix(.branch))]
pub struct ResolveError {
    pub stage: Stage,
    pub identifier: String,
    /// Set for failures below the run-wide stages.
    pub branch: Option<BranchScope>,
    #[source]
    pub source: ProviderError,
}

impl ResolveError {
    pub fn new(stage: Stage, identifier: impl Into<String>, source: ProviderError) -> Self {
        Self {
            stage,
            identifier: identifier.into(),
            branch: None,
            source,
        }
    }

    pub fn in_branch(mut self, group: impl Into<String>, target_group: Option<String>) -> Self {
        self.branch = Some(BranchScope {
            group: group.into(),
            target_group,
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, ProviderError::Cancelled { .. })
    }

    fn sort_key(&self) -> (Stage, &str, Option<&BranchScope>, String) {
        (
            self.stage,
            &self.identifier,
            self.branch.as_ref(),
            self.source.to_string(),
        )
    }
}

/// Orders failures canonically and drops exact repeats.
pub fn canonicalize_failures(failures: &mut Vec<ResolveError>) {
    failures.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    failures.dedup_by(|a, b| a.sort_key() == b.sort_key());
}
