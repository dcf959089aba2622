//! In-memory provider backed by a JSON document.
//!
//! Serves the same five operations as the AWS provider, split into pages of a
//! configurable size, and can inject failures for chosen identifiers. Used by
//! the test suite and by `--fixture` for offline runs.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Page, Provider, ProviderError, operation};
use crate::resource::{AutoscalingGroup, Listener, Rule, Tag, TargetGroup};

pub const DEFAULT_FIXTURE_PAGE_SIZE: usize = 50;

/// Matches any identifier in an injected failure.
pub const ANY_IDENTIFIER: &str = "*";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub groups: Vec<AutoscalingGroup>,
    #[serde(default)]
    pub target_groups: Vec<TargetGroup>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub failures: Vec<InjectedFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Throttled,
    Transient,
    Service,
    /// Never answers; the caller's timeout has to fire.
    Hang,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InjectedFailure {
    /// Operation name, e.g. `DescribeRules`.
    pub operation: String,
    pub identifier: String,
    pub kind: FailureKind,
    /// Number of calls that fail before the operation recovers. `None` fails forever.
    #[serde(default)]
    pub times: Option<u32>,
}

impl InjectedFailure {
    pub fn new(operation: &str, identifier: &str, kind: FailureKind) -> Self {
        Self {
            operation: operation.to_string(),
            identifier: identifier.to_string(),
            kind,
            times: None,
        }
    }

    pub fn times(mut self, times: u32) -> Self {
        self.times = Some(times);
        self
    }

    fn applies_to(&self, operation: &str, identifiers: &[&str]) -> bool {
        self.operation == operation
            && (self.identifier == ANY_IDENTIFIER
                || identifiers.iter().any(|id| *id == self.identifier))
    }

    fn to_error(&self, operation: &'static str) -> ProviderError {
        let message = format!("injected failure for '{}'", self.identifier);
        match self.kind {
            FailureKind::Throttled => ProviderError::Throttled { operation, message },
            FailureKind::Transient | FailureKind::Hang => {
                ProviderError::Transient { operation, message }
            }
            FailureKind::Service => ProviderError::Service {
                operation,
                code: "InjectedFailure".to_string(),
                message,
            },
        }
    }
}

/// One request seen by the fixture provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub identifiers: Vec<String>,
}

#[derive(Debug)]
pub struct FixtureProvider {
    fixture: Fixture,
    page_size: usize,
    remaining_failures: Mutex<Vec<(InjectedFailure, Option<u32>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FixtureProvider {
    pub fn new(fixture: Fixture) -> Self {
        let remaining = fixture
            .failures
            .iter()
            .cloned()
            .map(|f| {
                let times = f.times;
                (f, times)
            })
            .collect();

        Self {
            fixture,
            page_size: DEFAULT_FIXTURE_PAGE_SIZE,
            remaining_failures: Mutex::new(remaining),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!("cannot read fixture {}: {e}", path.display()))
        })?;
        let fixture: Fixture = serde_json::from_str(&raw).map_err(|e| {
            ProviderError::Configuration(format!("invalid fixture {}: {e}", path.display()))
        })?;
        Ok(Self::new(fixture))
    }

    /// Page size for every paginated operation. Clamped to at least one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    async fn enter(
        &self,
        operation: &'static str,
        identifiers: &[&str],
    ) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                operation,
                identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            });

        let triggered = {
            let mut failures = self
                .remaining_failures
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            failures
                .iter_mut()
                .find(|(f, left)| f.applies_to(operation, identifiers) && left != &Some(0))
                .map(|(f, left)| {
                    if let Some(n) = left {
                        *n -= 1;
                    }
                    f.clone()
                })
        };

        match triggered {
            Some(failure) if failure.kind == FailureKind::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(failure.to_error(operation))
            }
            Some(failure) => Err(failure.to_error(operation)),
            None => Ok(()),
        }
    }

    fn paginate<T: Clone>(
        &self,
        operation: &'static str,
        items: Vec<T>,
        next_token: Option<String>,
    ) -> Result<Page<T>, ProviderError> {
        let offset = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| ProviderError::Service {
                operation,
                code: "InvalidNextToken".to_string(),
                message: format!("invalid token '{token}'"),
            })?,
            None => 0,
        };

        let end = offset.saturating_add(self.page_size).min(items.len());
        let page = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
        let next = (end < items.len()).then(|| end.to_string());

        Ok(Page::new(page, next))
    }
}

#[async_trait]
impl Provider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn describe_tags(
        &self,
        project: &str,
        next_token: Option<String>,
    ) -> Result<Page<Tag>, ProviderError> {
        self.enter(operation::DESCRIBE_TAGS, &[project]).await?;

        let tags = self
            .fixture
            .tags
            .iter()
            .filter(|t| t.value == project)
            .cloned()
            .collect();

        self.paginate(operation::DESCRIBE_TAGS, tags, next_token)
    }

    async fn describe_auto_scaling_groups(
        &self,
        names: &[String],
        next_token: Option<String>,
    ) -> Result<Page<AutoscalingGroup>, ProviderError> {
        let ids: Vec<&str> = names.iter().map(String::as_str).collect();
        self.enter(operation::DESCRIBE_AUTO_SCALING_GROUPS, &ids)
            .await?;

        // Unknown names are silently skipped, as the real API does.
        let groups = self
            .fixture
            .groups
            .iter()
            .filter(|g| names.is_empty() || names.contains(&g.name))
            .cloned()
            .collect();

        self.paginate(operation::DESCRIBE_AUTO_SCALING_GROUPS, groups, next_token)
    }

    async fn describe_target_groups(
        &self,
        ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<TargetGroup>, ProviderError> {
        let requested: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.enter(operation::DESCRIBE_TARGET_GROUPS, &requested)
            .await?;

        let target_groups = self
            .fixture
            .target_groups
            .iter()
            .filter(|tg| ids.contains(&tg.id))
            .cloned()
            .collect();

        self.paginate(operation::DESCRIBE_TARGET_GROUPS, target_groups, next_token)
    }

    async fn describe_listeners(
        &self,
        load_balancer_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Listener>, ProviderError> {
        self.enter(operation::DESCRIBE_LISTENERS, &[load_balancer_id])
            .await?;

        let listeners = self
            .fixture
            .listeners
            .iter()
            .filter(|l| l.load_balancer_id == load_balancer_id)
            .map(|l| Listener {
                rules: Vec::new(),
                ..l.clone()
            })
            .collect();

        self.paginate(operation::DESCRIBE_LISTENERS, listeners, next_token)
    }

    async fn describe_rules(
        &self,
        listener_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Rule>, ProviderError> {
        self.enter(operation::DESCRIBE_RULES, &[listener_id]).await?;

        let rules = self
            .fixture
            .listeners
            .iter()
            .find(|l| l.id == listener_id)
            .map(|l| l.rules.clone())
            .ok_or_else(|| ProviderError::Service {
                operation: operation::DESCRIBE_RULES,
                code: "ListenerNotFound".to_string(),
                message: format!("listener '{listener_id}' not found"),
            })?;

        self.paginate(operation::DESCRIBE_RULES, rules, next_token)
    }
}
