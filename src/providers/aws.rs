mod error;
mod types;

pub use error::{classify_error_code, classify_sdk_error};

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_autoscaling::types::Filter;

use super::{Page, Provider, ProviderError, ProviderSettings, operation};
use crate::resource::{AutoscalingGroup, Listener, Rule, Tag, TargetGroup};

/// Tag filter name matching on tag value.
const TAG_VALUE_FILTER: &str = "value";

#[derive(Clone)]
pub struct AwsProvider {
    autoscaling: aws_sdk_autoscaling::Client,
    elbv2: aws_sdk_elasticloadbalancingv2::Client,
}

impl AwsProvider {
    /// Loads the default AWS configuration chain, honoring the given overrides.
    ///
    /// SDK-level retries are disabled; retries happen once, in the call layer.
    pub async fn connect(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());

        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let config = loader.load().await;

        if config.region().is_none() {
            return Err(ProviderError::Configuration(
                "No AWS region configured. Set AWS_REGION or use --region flag".to_string(),
            ));
        }

        tracing::debug!(region = ?config.region(), "AWS configuration loaded");

        Ok(Self::from_clients(
            aws_sdk_autoscaling::Client::new(&config),
            aws_sdk_elasticloadbalancingv2::Client::new(&config),
        ))
    }

    /// NOTE: Primarily used for testing against mock endpoints.
    pub fn from_clients(
        autoscaling: aws_sdk_autoscaling::Client,
        elbv2: aws_sdk_elasticloadbalancingv2::Client,
    ) -> Self {
        Self { autoscaling, elbv2 }
    }
}

impl std::fmt::Debug for AwsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    async fn describe_tags(
        &self,
        project: &str,
        next_token: Option<String>,
    ) -> Result<Page<Tag>, ProviderError> {
        let filter = Filter::builder()
            .name(TAG_VALUE_FILTER)
            .values(project)
            .build();

        let output = self
            .autoscaling
            .describe_tags()
            .filters(filter)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify_sdk_error(operation::DESCRIBE_TAGS, &e))?;

        let tags = output.tags().iter().filter_map(types::tag_from_sdk).collect();

        Ok(Page::new(tags, types::non_empty(output.next_token())))
    }

    async fn describe_auto_scaling_groups(
        &self,
        names: &[String],
        next_token: Option<String>,
    ) -> Result<Page<AutoscalingGroup>, ProviderError> {
        let output = self
            .autoscaling
            .describe_auto_scaling_groups()
            .set_auto_scaling_group_names(Some(names.to_vec()))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify_sdk_error(operation::DESCRIBE_AUTO_SCALING_GROUPS, &e))?;

        let groups = output
            .auto_scaling_groups()
            .iter()
            .filter_map(types::group_from_sdk)
            .collect();

        Ok(Page::new(groups, types::non_empty(output.next_token())))
    }

    async fn describe_target_groups(
        &self,
        ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<TargetGroup>, ProviderError> {
        let output = self
            .elbv2
            .describe_target_groups()
            .set_target_group_arns(Some(ids.to_vec()))
            .set_marker(next_token)
            .send()
            .await
            .map_err(|e| classify_sdk_error(operation::DESCRIBE_TARGET_GROUPS, &e))?;

        let target_groups = output
            .target_groups()
            .iter()
            .filter_map(types::target_group_from_sdk)
            .collect();

        Ok(Page::new(target_groups, types::non_empty(output.next_marker())))
    }

    async fn describe_listeners(
        &self,
        load_balancer_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Listener>, ProviderError> {
        let output = self
            .elbv2
            .describe_listeners()
            .load_balancer_arn(load_balancer_id)
            .set_marker(next_token)
            .send()
            .await
            .map_err(|e| classify_sdk_error(operation::DESCRIBE_LISTENERS, &e))?;

        let listeners = output
            .listeners()
            .iter()
            .filter_map(|l| types::listener_from_sdk(l, load_balancer_id))
            .collect();

        Ok(Page::new(listeners, types::non_empty(output.next_marker())))
    }

    async fn describe_rules(
        &self,
        listener_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Rule>, ProviderError> {
        let output = self
            .elbv2
            .describe_rules()
            .listener_arn(listener_id)
            .set_marker(next_token)
            .send()
            .await
            .map_err(|e| classify_sdk_error(operation::DESCRIBE_RULES, &e))?;

        let rules = output.rules().iter().map(types::rule_from_sdk).collect();

        Ok(Page::new(rules, types::non_empty(output.next_marker())))
    }
}
