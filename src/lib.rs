//! lbtrace - load balancer listener tracing
//!
//! Walks project tags, autoscaling groups, target groups, load balancers and
//! listener rules to find which listeners forward traffic to a project's stage.

pub mod call;
pub mod cli;
pub mod config;
pub mod error;
pub mod matcher;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod resolvers;
pub mod resource;

pub use config::TraceConfig;
pub use error::LbTraceError;
pub use matcher::{MatchMode, StageMatcher};
pub use pipeline::{Pipeline, TraceReport};
pub use providers::{Provider, ProviderError, ProviderSettings, get_provider};
pub use resolvers::{BranchScope, ResolveError, Stage};
pub use resource::Correlation;
