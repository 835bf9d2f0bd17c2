//! Scenario renderers and the registry that dispatches to them.
//!
//! Each scenario implements [`View`]: a parameter schema plus an `execute`
//! that validates raw parameters and produces a [`RenderOutcome`]. Upstream
//! data failures never escape a renderer; they surface as a degraded-but-valid
//! result so callers (and tests) can observe them without side-channel logs.

pub mod code_status;
pub mod github;
pub mod image;
pub mod text;
pub mod title_card;
pub mod umami_stats;
pub mod work;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{DitherKernel, DitherType};
use crate::font::FontService;

/// Field type in a scenario's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    /// Base64-encoded binary payload.
    Base64,
    /// One of a fixed set of string values.
    Enum(&'static [&'static str]),
}

/// One entry of a scenario's parameter schema, for external validation/UI.
#[derive(Debug, Clone, Copy)]
pub struct ParamField {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

/// Schema entries for the display hints every image scenario accepts.
pub const HINT_FIELDS: [ParamField; 4] = [
    ParamField { name: "link", kind: ParamKind::String, required: false },
    ParamField { name: "border", kind: ParamKind::Integer, required: false },
    ParamField {
        name: "dither_type",
        kind: ParamKind::Enum(&["DIFFUSION", "ORDERED", "NONE"]),
        required: false,
    },
    ParamField { name: "dither_kernel", kind: ParamKind::String, required: false },
];

/// Opaque display hints forwarded unchanged to the delivery API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayHints {
    pub link: Option<String>,
    pub border: Option<i64>,
    pub dither_type: Option<DitherType>,
    pub dither_kernel: Option<DitherKernel>,
}

/// Structured text payload for text-only scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPayload {
    pub title: Option<String>,
    pub message: String,
    /// HH:MM render timestamp.
    pub signature: Option<String>,
}

/// PNG payload plus forwarded hints for image scenarios.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub png: Vec<u8>,
    pub hints: DisplayHints,
}

/// What a successful `execute` produces.
#[derive(Debug, Clone)]
pub enum RenderResult {
    Image(ImagePayload),
    Text(TextPayload),
}

impl RenderResult {
    /// PNG bytes, when this is an image result.
    pub fn png(&self) -> Option<&[u8]> {
        match self {
            Self::Image(payload) => Some(&payload.png),
            Self::Text(_) => None,
        }
    }
}

/// A render result plus whether it was produced on the degraded path.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub result: RenderResult,
    /// `Some(reason)` when upstream data failed and placeholder content
    /// was rendered instead.
    pub degraded: Option<String>,
}

impl RenderOutcome {
    pub fn ok(result: RenderResult) -> Self {
        Self { result, degraded: None }
    }

    pub fn degraded(result: RenderResult, reason: impl Into<String>) -> Self {
        Self { result, degraded: Some(reason.into()) }
    }
}

/// Renderer failures. Fetch errors are not here by design: they degrade.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("invalid parameters for {scenario}: {message}")]
    InvalidParams { scenario: &'static str, message: String },
    /// Drawing/composition failure — a logic bug, not an environmental one.
    #[error("render failed: {0}")]
    Render(String),
}

/// A scenario renderer: parameter schema + execution.
pub trait View: Send + Sync {
    fn schema(&self) -> &'static [ParamField];
    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError>;
}

/// Deserialize raw parameters into a scenario's typed set.
pub(crate) fn parse_params<T: DeserializeOwned>(
    scenario: &'static str,
    params: serde_json::Value,
) -> Result<T, ViewError> {
    serde_json::from_value(params)
        .map_err(|err| ViewError::InvalidParams { scenario, message: err.to_string() })
}

pub(crate) fn encode_png(canvas: &crate::canvas::Canvas) -> Result<Vec<u8>, ViewError> {
    canvas.to_png().map_err(|err| ViewError::Render(err.to_string()))
}

/// Current local time as the HH:MM signature drawn on cards.
pub(crate) fn signature_now() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Format a count with K/M suffixes for large values.
pub(crate) fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Format seconds as `Ns`, `Nm`, `Nh` or `Nh Nm`.
pub(crate) fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    }
}

/// Maps scenario names to renderers. The set is open: new scenarios can be
/// registered at runtime without touching existing ones.
pub struct Registry {
    views: HashMap<String, Box<dyn View>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { views: HashMap::new() }
    }

    /// A registry with every built-in scenario, sharing one font service.
    pub fn with_defaults(fonts: Arc<FontService>) -> Self {
        let mut registry = Self::new();
        registry.register("text", Box::new(text::TextView));
        registry.register("work", Box::new(work::WorkView));
        registry.register("code_status", Box::new(code_status::CodeStatusView::new(fonts.clone())));
        registry.register("title_image", Box::new(title_card::TitleCardView::new(fonts.clone())));
        registry.register("umami_stats", Box::new(umami_stats::UmamiStatsView::new(fonts.clone())));
        registry
            .register("github_contributions", Box::new(github::GithubContributionsView::new(fonts)));
        registry.register("image", Box::new(image::RawImageView));
        registry
    }

    pub fn register(&mut self, name: &str, view: Box<dyn View>) {
        self.views.insert(name.to_owned(), view);
    }

    /// Registered scenario names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parameter schema for a scenario.
    pub fn schema(&self, name: &str) -> Result<&'static [ParamField], ViewError> {
        self.views
            .get(name)
            .map(|view| view.schema())
            .ok_or_else(|| ViewError::UnknownScenario(name.to_owned()))
    }

    /// Look up, validate, and invoke a scenario.
    pub fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<RenderOutcome, ViewError> {
        let view = self
            .views
            .get(name)
            .ok_or_else(|| ViewError::UnknownScenario(name.to_owned()))?;
        view.execute(params)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults(Arc::new(FontService::new()))
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> Registry {
    use std::path::PathBuf;
    Registry::with_defaults(Arc::new(FontService::with_search_paths(
        PathBuf::from("/nonexistent"),
        Vec::new(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scenario_is_named_in_error() {
        let registry = test_registry();
        let err = registry.execute("no_such_view", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ViewError::UnknownScenario(ref n) if n == "no_such_view"));
        assert!(err.to_string().contains("no_such_view"));
    }

    #[test]
    fn default_scenarios_are_registered() {
        let registry = test_registry();
        let names = registry.names();
        for expected in [
            "code_status",
            "github_contributions",
            "image",
            "text",
            "title_image",
            "umami_stats",
            "work",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn invalid_params_name_the_field() {
        let registry = test_registry();
        let err = registry.execute("text", serde_json::json!({"title": "no message"})).unwrap_err();
        match err {
            ViewError::InvalidParams { scenario, message } => {
                assert_eq!(scenario, "text");
                assert!(message.contains("message"), "unhelpful message: {message}");
            }
            other => panic!("expected InvalidParams, got {other:?}"),
        }
    }

    #[test]
    fn runtime_registration_is_open() {
        struct EchoView;
        impl View for EchoView {
            fn schema(&self) -> &'static [ParamField] {
                &[]
            }
            fn execute(&self, _params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
                Ok(RenderOutcome::ok(RenderResult::Text(TextPayload {
                    title: None,
                    message: "echo".into(),
                    signature: None,
                })))
            }
        }

        let mut registry = test_registry();
        registry.register("echo", Box::new(EchoView));
        let outcome = registry.execute("echo", serde_json::json!({})).unwrap();
        assert!(outcome.degraded.is_none());
        match outcome.result {
            RenderResult::Text(payload) => assert_eq!(payload.message, "echo"),
            RenderResult::Image(_) => panic!("expected text"),
        }
    }

    #[test]
    fn schema_lookup_matches_registration() {
        let registry = test_registry();
        let schema = registry.schema("title_image").unwrap();
        assert!(schema.iter().any(|f| f.name == "main_title" && f.required));
        assert!(registry.schema("nope").is_err());
    }

    #[test]
    fn count_formatting() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_300_000), "2.3M");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(3599), "59m");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(3660), "1h 1m");
        assert_eq!(format_duration(7265), "2h 1m");
    }
}
