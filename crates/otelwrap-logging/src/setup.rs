//! Logging instrumentation: one call installs the global subscriber.

use crate::error::ConfigError;
use crate::formatter::{TextFormatter, TextLayout};
use crate::handler::{get_json_handler, HandlerConfig, JsonHandler};
use crate::layer::JsonLogLayer;
use crate::record::Level;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::trace::{Config, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::dispatcher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component, output format and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON lines (true) or one of the text layouts (false)
    #[serde(default = "default_true")]
    pub json: bool,
    /// Text layout: verbose (true) or minimal traceparent form (false)
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Append to this file instead of writing to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub tracing: TracingConfig,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: true,
            verbose: true,
            path: None,
            tracing: TracingConfig::default(),
        }
    }
}

impl LogConfig {
    /// `EnvFilter` directives: "info,otelwrap_core=debug" etc.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }

    /// Lowest level any directive lets through; the handler threshold.
    pub fn handler_level(&self) -> Result<Level, ConfigError> {
        let global: Level = self.level.parse()?;
        Ok(self
            .components
            .values()
            .filter_map(|level| level.parse::<Level>().ok())
            .fold(global, Level::min))
    }
}

/// OpenTelemetry tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Attach the OpenTelemetry layer so records carry trace and span ids
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `service.name` resource attribute and `otelServiceName` field
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "otelwrap".into()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: default_service_name(),
        }
    }
}

/// Result of [`instrument_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrumentation {
    Installed,
    /// Logging was already instrumented; nothing changed.
    Unchanged,
}

struct InstallState {
    provider: Option<TracerProvider>,
}

static INSTALL_STATE: OnceLock<Mutex<InstallState>> = OnceLock::new();

/// Install the global subscriber described by `config`.
///
/// Idempotent: once installed, further calls return
/// [`Instrumentation::Unchanged`]. With `force`, a second install is
/// attempted, which fails with [`ConfigError::AlreadyInstalled`] because a
/// global subscriber cannot be replaced.
pub fn instrument_logging(config: &LogConfig, force: bool) -> Result<Instrumentation, ConfigError> {
    if INSTALL_STATE.get().is_some() && !force {
        return Ok(Instrumentation::Unchanged);
    }
    if dispatcher::has_been_set() {
        return Err(ConfigError::AlreadyInstalled);
    }

    let level = config.handler_level()?;
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = config.tracing.enabled.then(|| build_tracer_provider(&config.tracing));
    let otel_layer = provider.as_ref().map(|provider| {
        global::set_tracer_provider(provider.clone());
        tracing_opentelemetry::layer().with_tracer(provider.tracer("otelwrap"))
    });

    let handler = build_handler(config, level)?;
    let log_layer = JsonLogLayer::new(handler, config.tracing.service_name.as_str());

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(log_layer)
        .try_init()
        .map_err(|_| ConfigError::AlreadyInstalled)?;

    let state = INSTALL_STATE.get_or_init(|| Mutex::new(InstallState { provider: None }));
    let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
    state.provider = provider;
    tracing::debug!(json = config.json, level = %level, "logging instrumented");
    Ok(Instrumentation::Installed)
}

/// Flush and drop the tracer provider, if one was installed.
pub fn shutdown() {
    if let Some(state) = INSTALL_STATE.get() {
        let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
        if state.provider.take().is_some() {
            global::shutdown_tracer_provider();
        }
    }
}

fn build_tracer_provider(config: &TracingConfig) -> TracerProvider {
    TracerProvider::builder()
        .with_config(
            Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_resource(Resource::new([KeyValue::new(
                    "service.name",
                    config.service_name.clone(),
                )])),
        )
        .build()
}

/// JSON lines share the cached handler; text layouts get their own.
fn build_handler(config: &LogConfig, level: Level) -> Result<Arc<JsonHandler>, ConfigError> {
    let handler_config = HandlerConfig {
        level,
        path: config.path.clone(),
        stream: None,
    };
    if config.json {
        return get_json_handler(&handler_config);
    }
    let layout = if config.verbose {
        TextLayout::Verbose
    } else {
        TextLayout::Minimal
    };
    let handler = JsonHandler::new(&handler_config)?.with_formatter(TextFormatter::new(layout));
    Ok(Arc::new(handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_empty_json() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.level, "info");
        assert!(config.json);
        assert!(config.verbose);
        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "otelwrap");
    }

    #[test]
    fn directives_include_components() {
        let mut config = LogConfig::default();
        config.components.insert("otelwrap-core".into(), "debug".into());
        assert_eq!(config.directives(), "info,otelwrap_core=debug");
        assert_eq!(config.handler_level().unwrap(), Level::Debug);
    }

    #[test]
    fn text_handler_is_not_cached() {
        let config = LogConfig {
            json: false,
            ..LogConfig::default()
        };
        let a = build_handler(&config, Level::Info).unwrap();
        let b = build_handler(&config, Level::Info).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
