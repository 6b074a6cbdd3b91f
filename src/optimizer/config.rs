//! Optimizer configuration

use crate::utils::Result;
use serde::{Deserialize, Serialize};

/// Feature switches and tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Defer `img[data-src]` until near the viewport
    pub lazy_load: bool,
    /// Distance in pixels from the viewport at which images load
    pub lazy_load_threshold: f64,
    /// Hint same-origin links ahead of navigation
    pub prefetch: bool,
    /// Distance in pixels from the viewport at which links are hinted
    pub prefetch_distance: f64,
    /// Animate in-page anchor navigation
    pub smooth_scroll: bool,
    pub font_optimization: bool,
    pub resource_hints: bool,
    /// Rewrite blocking external scripts to `defer`
    #[serde(rename = "deferJS")]
    pub defer_js: bool,
    /// Report metrics on load
    pub analytics: bool,
    pub analytics_endpoint: Option<String>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lazy_load: true,
            lazy_load_threshold: 200.0,
            prefetch: true,
            prefetch_distance: 800.0,
            smooth_scroll: true,
            font_optimization: true,
            resource_hints: true,
            defer_js: true,
            analytics: false,
            analytics_endpoint: None,
            debug: false,
        }
    }
}

impl Config {
    /// Defaults overridden by the fields present in `patch`
    pub fn with_patch(patch: &ConfigPatch) -> Self {
        let mut config = Self::default();
        config.merge(patch);
        config
    }

    /// Overwrite the fields present in `patch`
    pub fn merge(&mut self, patch: &ConfigPatch) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &patch.$field {
                    self.$field = value.clone();
                })*
            };
        }
        apply!(
            lazy_load,
            lazy_load_threshold,
            prefetch,
            prefetch_distance,
            smooth_scroll,
            font_optimization,
            resource_hints,
            defer_js,
            analytics,
            debug,
        );
        if let Some(endpoint) = &patch.analytics_endpoint {
            self.analytics_endpoint = Some(endpoint.clone());
        }
    }

    /// Endpoint to report to, if reporting is on
    pub fn report_endpoint(&self) -> Option<&str> {
        self.analytics_endpoint
            .as_deref()
            .filter(|endpoint| self.analytics && !endpoint.is_empty())
    }
}

/// Partial configuration; `None` fields leave the current value alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lazy_load: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lazy_load_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetch_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth_scroll: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_optimization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_hints: Option<bool>,
    #[serde(rename = "deferJS", skip_serializing_if = "Option::is_none")]
    pub defer_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of camelCase option names
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn lazy_load(mut self, enabled: bool) -> Self {
        self.lazy_load = Some(enabled);
        self
    }

    pub fn lazy_load_threshold(mut self, pixels: f64) -> Self {
        self.lazy_load_threshold = Some(pixels);
        self
    }

    pub fn prefetch(mut self, enabled: bool) -> Self {
        self.prefetch = Some(enabled);
        self
    }

    pub fn prefetch_distance(mut self, pixels: f64) -> Self {
        self.prefetch_distance = Some(pixels);
        self
    }

    pub fn smooth_scroll(mut self, enabled: bool) -> Self {
        self.smooth_scroll = Some(enabled);
        self
    }

    pub fn font_optimization(mut self, enabled: bool) -> Self {
        self.font_optimization = Some(enabled);
        self
    }

    pub fn resource_hints(mut self, enabled: bool) -> Self {
        self.resource_hints = Some(enabled);
        self
    }

    pub fn defer_js(mut self, enabled: bool) -> Self {
        self.defer_js = Some(enabled);
        self
    }

    pub fn analytics(mut self, enabled: bool) -> Self {
        self.analytics = Some(enabled);
        self
    }

    pub fn analytics_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.analytics_endpoint = Some(endpoint.into());
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }

    /// Patch that turns every feature off, for enabling them one at a time
    pub fn all_features_off() -> Self {
        Self::new()
            .lazy_load(false)
            .prefetch(false)
            .smooth_scroll(false)
            .font_optimization(false)
            .resource_hints(false)
            .defer_js(false)
    }
}
