use crate::events::EventChannel;
use crate::sync::Arc;
use std::time::Instant;
use thiserror::*;

/// A collection of flags and options that affect how planning runs. This is
/// not specific to a single deployment, it relates to the planner itself.
///
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(error = "ConfigError"))]
pub struct Config {
    /// Treat an ambiguous component match as a hard error instead of picking
    /// the first match and moving on.
    #[builder(default = "false")]
    strict_ambiguous_matches: bool,

    /// Upper bound on the number of auto-resolution passes over a single
    /// plan. The cycle detector should always fire first; this is the
    /// backstop that keeps a broken catalog from wedging a request.
    #[builder(default = "self.default_max_resolution_depth()")]
    max_resolution_depth: usize,

    /// The DNS domain under which generated resource names are rooted when a
    /// deployment does not override it.
    #[builder(default = "self.default_default_domain()")]
    default_domain: String,

    /// The user driving this planner.
    #[builder(default = "self.default_current_user()")]
    current_user: String,

    /// The time at which this configuration was created. We will use this to
    /// compute the total planning time.
    #[builder(default = "self.default_created_at()")]
    created_at: Instant,

    /// The Event Channel used across the application.
    /// NOTE: this is safe to clone since it is really an [Arc] to a queue.
    #[builder(default = "self.default_event_channel()")]
    event_channel: Arc<EventChannel>,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build().unwrap()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn strict_ambiguous_matches(&self) -> bool {
        self.strict_ambiguous_matches
    }

    pub fn max_resolution_depth(&self) -> usize {
        self.max_resolution_depth
    }

    pub fn default_domain(&self) -> &str {
        self.default_domain.as_ref()
    }

    pub fn current_user(&self) -> &str {
        self.current_user.as_ref()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn event_channel(&self) -> Arc<EventChannel> {
        self.event_channel.clone()
    }
}

impl ConfigBuilder {
    fn default_max_resolution_depth(&self) -> usize {
        1024
    }

    fn default_default_domain(&self) -> String {
        "rollout.local".to_string()
    }

    fn default_current_user(&self) -> String {
        whoami::username()
    }

    fn default_created_at(&self) -> Instant {
        Instant::now()
    }

    fn default_event_channel(&self) -> Arc<EventChannel> {
        EventChannel::new().into()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Attempted to build a Config struct while missing fields: {0:?}")]
    BuilderError(derive_builder::UninitializedFieldError),
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        Self::BuilderError(err)
    }
}
