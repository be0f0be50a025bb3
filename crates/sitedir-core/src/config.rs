//! Tenant-level configuration document.
//!
//! The document is stored and loaded as a single unit. Every section carries
//! `#[serde(default)]` so documents written by older releases still load, and
//! unknown keys survive a round trip through the `extra` maps.
//!
//! New sites get their document from [`SiteConfig::from_overrides`], which
//! deep-merges caller values over [`SiteConfig::default`]; see
//! [`crate::merge`] for the exact rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::merge::merge_over_defaults;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub company: String,
    pub content_license: String,
    pub footer_extra: String,
    pub page_extensions: Vec<String>,
    pub defaults: DisplayDefaults,
    pub features: FeatureToggles,
    pub logo_url: String,
    pub logo_text: bool,
    pub sitemap: bool,
    pub robots: RobotsPolicy,
    pub locale: String,
    pub locale_namespacing: bool,
    pub locale_namespaces: Vec<String>,
    pub theme: Theme,
    /// Keys not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Wiki Site".into(),
            description: String::new(),
            company: String::new(),
            content_license: String::new(),
            footer_extra: String::new(),
            page_extensions: vec!["md".into(), "html".into(), "txt".into()],
            defaults: DisplayDefaults::default(),
            features: FeatureToggles::default(),
            logo_url: String::new(),
            logo_text: true,
            sitemap: true,
            robots: RobotsPolicy::default(),
            locale: "en".into(),
            locale_namespacing: false,
            locale_namespaces: Vec::new(),
            theme: Theme::default(),
            extra: Map::new(),
        }
    }
}

impl SiteConfig {
    /// Build a complete document from caller-supplied overrides.
    ///
    /// `None` and `null` yield the defaults unchanged. Any other non-object
    /// value is rejected, as is an override whose leaves do not fit the
    /// typed sections (e.g. `"theme": {"dark": "yes"}`).
    pub fn from_overrides(overrides: Option<Value>) -> Result<Self> {
        let overrides = match overrides {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(map)) => Value::Object(map),
            Some(other) => {
                return Err(CoreError::invalid_config(format!(
                    "configuration must be a JSON object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut document = serde_json::to_value(Self::default())?;
        merge_over_defaults(&mut document, overrides);

        serde_json::from_value(document).map_err(|e| CoreError::invalid_config(e.to_string()))
    }

    /// Render the document as JSON.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a document read back from storage.
    ///
    /// Stored documents are never rejected: `null` leaves take their default
    /// and leaves that do not fit the typed sections are replaced by their
    /// default too. Returns the JSON pointers of the replaced values.
    pub fn from_stored(stored: Value) -> (Self, Vec<String>) {
        let mut rejected = Vec::new();

        let overlay = match stored {
            Value::Object(map) => map,
            Value::Null => return (Self::default(), rejected),
            _ => {
                rejected.push(String::new());
                return (Self::default(), rejected);
            }
        };

        let Ok(mut document) = Self::default().to_json() else {
            rejected.push(String::new());
            return (Self::default(), rejected);
        };

        let mut merged = document.clone();
        merge_over_defaults(&mut merged, Value::Object(overlay.clone()));
        if let Ok(config) = serde_json::from_value(merged) {
            return (config, rejected);
        }

        merge_checked(&mut document, "", overlay, &mut rejected);
        (
            serde_json::from_value(document).unwrap_or_default(),
            rejected,
        )
    }
}

/// Merge `overlay` into the object at `pointer` key by key, keeping only the
/// keys after which `document` still decodes as a [`SiteConfig`].
fn merge_checked(
    document: &mut Value,
    pointer: &str,
    overlay: Map<String, Value>,
    rejected: &mut Vec<String>,
) {
    for (key, value) in overlay {
        if value.is_null() {
            continue;
        }
        let child = format!("{pointer}/{}", key.replace('~', "~0").replace('/', "~1"));

        let mut candidate = document.clone();
        let Some(Value::Object(parent)) = candidate.pointer_mut(pointer) else {
            rejected.push(child);
            continue;
        };
        match parent.get_mut(&key) {
            Some(existing) => merge_over_defaults(existing, value.clone()),
            None => {
                parent.insert(key, value.clone());
            }
        }

        if serde_json::from_value::<SiteConfig>(candidate.clone()).is_ok() {
            *document = candidate;
            continue;
        }

        let descend = matches!(document.pointer(&child), Some(Value::Object(_)));
        match value {
            Value::Object(inner) if descend => merge_checked(document, &child, inner, rejected),
            _ => rejected.push(child),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayDefaults {
    pub timezone: String,
    pub date_format: String,
    pub time_format: String,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".into(),
            date_format: "YYYY-MM-DD".into(),
            time_format: "12h".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureToggles {
    pub ratings: bool,
    pub ratings_mode: String,
    pub comments: bool,
    pub contributions: bool,
    pub profile: bool,
    pub search: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            ratings: false,
            ratings_mode: "off".into(),
            comments: false,
            contributions: false,
            profile: true,
            search: true,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotsPolicy {
    pub index: bool,
    pub follow: bool,
}

impl Default for RobotsPolicy {
    fn default() -> Self {
        Self {
            index: true,
            follow: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub dark: bool,
    pub color_primary: String,
    pub color_secondary: String,
    pub color_accent: String,
    pub color_header: String,
    pub color_sidebar: String,
    #[serde(rename = "injectCSS")]
    pub inject_css: String,
    pub inject_head: String,
    pub inject_body: String,
    pub sidebar_position: String,
    pub toc_position: String,
    pub show_sharing_menu: bool,
    pub show_print_btn: bool,
    pub base_font: String,
    pub content_font: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            dark: false,
            color_primary: "#1976d2".into(),
            color_secondary: "#02c39a".into(),
            color_accent: "#f03a47".into(),
            color_header: "#000000".into(),
            color_sidebar: "#1976d2".into(),
            inject_css: String::new(),
            inject_head: String::new(),
            inject_body: String::new(),
            sidebar_position: "left".into(),
            toc_position: "right".into(),
            show_sharing_menu: true,
            show_print_btn: true,
            base_font: "roboto".into(),
            content_font: "roboto".into(),
            extra: Map::new(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
