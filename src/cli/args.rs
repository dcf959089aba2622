use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, RetryPolicy, TraceConfig,
};
use crate::matcher::MatchMode;
use crate::output::OutputFormat;
use crate::providers::ProviderSettings;

/// Find the load balancer listeners that forward to a project's autoscaling groups.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Project tag value to look up.
    pub project: String,

    /// Stage matched against autoscaling group names.
    #[arg(long, env = "LBTRACE_STAGE", default_value = "staging")]
    pub stage: String,

    #[arg(long, default_value_t = MatchMode::Pattern)]
    pub match_mode: MatchMode,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    #[arg(long, env = "LBTRACE_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Maximum number of lookups in flight.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-call deadline in seconds.
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Serve resources from a JSON fixture instead of AWS.
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn provider_name(&self) -> &'static str {
        if self.fixture.is_some() { "fixture" } else { "aws" }
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
            fixture: self.fixture.clone(),
        }
    }

    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            concurrency: self.concurrency,
            call_timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
            match_mode: self.match_mode,
        }
    }
}
