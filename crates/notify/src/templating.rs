//! Minijinja template rendering for alert messages.
//!
//! Renders the subject and body of a trigger notification from the alert
//! that fired, its hive, the readings it fired on, and the evaluation time.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use std::collections::BTreeMap;

use crate::traits::NotifyError;

pub const DEFAULT_SUBJECT: &str = "Alert Triggered";
pub const DEFAULT_BODY: &str = "Alert triggered: {{ alert.name }} on hive {{ hive_id }} at {{ now }}";

/// Context data available to notification templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext {
    pub alert: AlertContext,
    pub hive_id: String,
    /// Snapshot values the alert was evaluated against, by parameter name.
    pub readings: BTreeMap<String, f64>,
    /// Evaluation time in RFC 3339 format.
    pub now: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertContext {
    pub id: String,
    pub name: String,
    /// Conditions in `parameter op threshold` form.
    pub conditions: Vec<String>,
}

/// Renders notification templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        env.add_filter("round", round_filter);

        // `lower` and `upper` are built-in with the "builtins" feature,
        // but we register explicit versions to guarantee availability.
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);

        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Subject and body templates for trigger notifications.
#[derive(Debug)]
pub struct MessageTemplates {
    subject: String,
    body: String,
    renderer: TemplateRenderer,
}

impl MessageTemplates {
    /// Build from optional overrides, validating their syntax up front.
    pub fn new(subject: Option<String>, body: Option<String>) -> Result<Self, NotifyError> {
        let renderer = TemplateRenderer::new();
        let subject = subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let body = body.unwrap_or_else(|| DEFAULT_BODY.to_string());

        renderer
            .validate(&subject)
            .map_err(|e| NotifyError::Config(format!("invalid subject template: {e}")))?;
        renderer
            .validate(&body)
            .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;

        Ok(Self {
            subject,
            body,
            renderer,
        })
    }

    /// Render `(subject, body)` for one alert.
    pub fn render(&self, ctx: &TemplateContext) -> Result<(String, String), NotifyError> {
        Ok((
            self.renderer.render(&self.subject, ctx)?,
            self.renderer.render(&self.body, ctx)?,
        ))
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
            renderer: TemplateRenderer::new(),
        }
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
