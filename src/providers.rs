pub mod aws;
pub mod fixture;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resource::{AutoscalingGroup, Listener, Rule, Tag, TargetGroup};

/// Operation names used in errors and logs.
pub mod operation {
    pub const DESCRIBE_TAGS: &str = "DescribeTags";
    pub const DESCRIBE_AUTO_SCALING_GROUPS: &str = "DescribeAutoScalingGroups";
    pub const DESCRIBE_TARGET_GROUPS: &str = "DescribeTargetGroups";
    pub const DESCRIBE_LISTENERS: &str = "DescribeListeners";
    pub const DESCRIBE_RULES: &str = "DescribeRules";
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{operation} throttled: {message}")]
    Throttled {
        operation: &'static str,
        message: String,
    },

    /// Network failure, 5xx or similar; worth another attempt.
    #[error("{operation} failed transiently: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} failed ({code}): {message}")]
    Service {
        operation: &'static str,
        code: String,
        message: String,
    },

    #[error("{operation} pagination did not terminate: {message}")]
    Pagination {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled { .. }
                | ProviderError::Transient { .. }
                | ProviderError::Timeout { .. }
        )
    }
}

/// One page of a provider listing. `next_token` is `None` on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }
}

/// The remote resource-description API the resolvers walk.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Tag records whose value equals `project`.
    async fn describe_tags(
        &self,
        project: &str,
        next_token: Option<String>,
    ) -> Result<Page<Tag>, ProviderError>;

    async fn describe_auto_scaling_groups(
        &self,
        names: &[String],
        next_token: Option<String>,
    ) -> Result<Page<AutoscalingGroup>, ProviderError>;

    async fn describe_target_groups(
        &self,
        ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<TargetGroup>, ProviderError>;

    async fn describe_listeners(
        &self,
        load_balancer_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Listener>, ProviderError>;

    /// One page of a listener's rules.
    async fn describe_rules(
        &self,
        listener_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Rule>, ProviderError>;
}

#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub fixture: Option<PathBuf>,
}

pub async fn get_provider(
    name: &str,
    settings: &ProviderSettings,
) -> Result<Box<dyn Provider>, ProviderError> {
    match name {
        "aws" => Ok(Box::new(aws::AwsProvider::connect(settings).await?)),
        "fixture" => {
            let path = settings.fixture.as_ref().ok_or_else(|| {
                ProviderError::Configuration("fixture provider requires --fixture".to_string())
            })?;
            Ok(Box::new(fixture::FixtureProvider::from_path(path)?))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
