use std::collections::BTreeSet;

use tracing::debug;

use super::{ResolveError, Stage};
use crate::call::CallContext;
use crate::matcher::StageMatcher;
use crate::providers::{Provider, operation};

/// Finds autoscaling groups tagged with a project whose name matches the stage.
#[derive(Clone, Copy)]
pub struct TagResolver<'a> {
    provider: &'a dyn Provider,
    calls: &'a CallContext,
}

impl<'a> TagResolver<'a> {
    pub fn new(provider: &'a dyn Provider, calls: &'a CallContext) -> Self {
        Self { provider, calls }
    }

    /// All pages are fetched before filtering; a failed page fails the whole
    /// lookup rather than yielding a partial set.
    pub async fn resolve(
        &self,
        project: &str,
        matcher: &StageMatcher,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let tags = self
            .calls
            .drain_pages(operation::DESCRIBE_TAGS, |token| {
                self.provider.describe_tags(project, token)
            })
            .await
            .map_err(|e| ResolveError::new(Stage::Tags, project, e))?;

        let total = tags.len();
        let matched: BTreeSet<String> = tags
            .into_iter()
            .filter(|tag| matcher.is_match(&tag.resource_id))
            .map(|tag| tag.resource_id)
            .collect();

        debug!(
            project,
            stage = matcher.as_str(),
            tags = total,
            matched = matched.len(),
            "tag records filtered"
        );

        Ok(matched)
    }
}
