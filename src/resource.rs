use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One tag record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub resource_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoscalingGroup {
    pub name: String,
    #[serde(default)]
    pub target_group_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetGroup {
    pub id: String,
    #[serde(default)]
    pub load_balancer_ids: BTreeSet<String>,
}

impl TargetGroup {
    /// Smallest load balancer identifier, so a target group reporting several
    /// load balancers always resolves to the same one.
    pub fn primary_load_balancer(&self) -> Option<&str> {
        self.load_balancer_ids.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Listener {
    pub id: String,
    pub load_balancer_id: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    /// Target groups reached by this rule's forward actions.
    #[serde(default)]
    pub forward_targets: BTreeSet<String>,
}

impl Rule {
    pub fn forwards_to(&self, target_group_id: &str) -> bool {
        self.forward_targets.contains(target_group_id)
    }
}

/// A listener confirmed to forward traffic into a group's target group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Correlation {
    pub group_name: String,
    pub target_group_id: String,
    pub listener_id: String,
}

impl Correlation {
    pub fn new(
        group_name: impl Into<String>,
        target_group_id: impl Into<String>,
        listener_id: impl Into<String>,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            target_group_id: target_group_id.into(),
            listener_id: listener_id.into(),
        }
    }
}

/// Collapses an identifier sequence into a canonical, deduplicated set.
pub fn dedup<I, S>(ids: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(Into::into).collect()
}
