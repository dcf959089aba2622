use aws_sdk_autoscaling::types::{AutoScalingGroup, TagDescription};
use aws_sdk_elasticloadbalancingv2::types as elbv2;

use crate::resource::{AutoscalingGroup, Listener, Rule, Tag, TargetGroup, dedup};

// AWS signals the last page with either a missing or an empty token
pub(super) fn non_empty(token: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty()).map(str::to_string)
}

pub(super) fn tag_from_sdk(tag: &TagDescription) -> Option<Tag> {
    Some(Tag {
        resource_id: tag.resource_id()?.to_string(),
        value: tag.value().unwrap_or_default().to_string(),
    })
}

pub(super) fn group_from_sdk(group: &AutoScalingGroup) -> Option<AutoscalingGroup> {
    Some(AutoscalingGroup {
        name: group.auto_scaling_group_name()?.to_string(),
        target_group_ids: dedup(group.target_group_arns().iter().map(String::as_str)),
    })
}

pub(super) fn target_group_from_sdk(target_group: &elbv2::TargetGroup) -> Option<TargetGroup> {
    Some(TargetGroup {
        id: target_group.target_group_arn()?.to_string(),
        load_balancer_ids: dedup(target_group.load_balancer_arns().iter().map(String::as_str)),
    })
}

pub(super) fn listener_from_sdk(
    listener: &elbv2::Listener,
    load_balancer_id: &str,
) -> Option<Listener> {
    Some(Listener {
        id: listener.listener_arn()?.to_string(),
        load_balancer_id: listener
            .load_balancer_arn()
            .unwrap_or(load_balancer_id)
            .to_string(),
        rules: Vec::new(),
    })
}

pub(super) fn rule_from_sdk(rule: &elbv2::Rule) -> Rule {
    Rule {
        id: rule.rule_arn().unwrap_or_default().to_string(),
        forward_targets: rule.actions().iter().flat_map(forward_targets).collect(),
    }
}

/// Target groups a single action forwards to. Actions of any other type
/// reach no target group; the legacy single-target shape is honored when no
/// `ForwardConfig` is present.
fn forward_targets(action: &elbv2::Action) -> Vec<String> {
    if action.r#type() != Some(&elbv2::ActionTypeEnum::Forward) {
        return Vec::new();
    }

    match action.forward_config() {
        Some(config) => config
            .target_groups()
            .iter()
            .filter_map(|tuple| tuple.target_group_arn())
            .map(str::to_string)
            .collect(),
        None => action
            .target_group_arn()
            .map(|arn| vec![arn.to_string()])
            .unwrap_or_default(),
    }
}
