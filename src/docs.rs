//! Documentation generator for registered settings
//!
//! Renders a Markdown reference of a [`Registry`]: one section per category,
//! one subsection per display group, one entry per setting.

use crate::config::{Definition, EnumSource, Registry, SettingValue};
use std::fmt::Write;

/// Configuration for docs generation
#[derive(Debug, Clone, Default)]
pub struct DocsConfig {
    /// Title for the documentation
    pub title: Option<String>,
    /// Description/introduction text
    pub description: Option<String>,
    /// Only document these categories (all when `None`)
    pub categories: Option<Vec<String>>,
}

impl DocsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    #[must_use]
    pub fn only_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }
}

/// Generate Markdown documentation for every registered setting.
///
/// Categories appear in registration order, groups in first-seen order.
/// Dynamic enum options are evaluated while rendering.
#[must_use]
pub fn generate_docs(registry: &Registry, config: DocsConfig) -> String {
    let mut output = String::new();

    let title = config
        .title
        .unwrap_or_else(|| "Settings Reference".to_string());
    let _ = writeln!(output, "# {title}\n");

    if let Some(desc) = config.description {
        let _ = writeln!(output, "{desc}\n");
    }

    let categories = registry.categories().into_iter().filter(|category| {
        config
            .categories
            .as_ref()
            .is_none_or(|wanted| wanted.contains(category))
    });

    for category in categories {
        let _ = writeln!(output, "## {}\n", capitalize(&category));
        for (group, definitions) in registry.grouped_definitions(&category) {
            if !group.is_empty() {
                let _ = writeln!(output, "### {group}\n");
            }
            for def in &definitions {
                format_setting(&mut output, &category, def);
            }
        }
    }

    output
}

fn format_setting(out: &mut String, category: &str, def: &Definition) {
    let _ = writeln!(out, "#### `{category}.{}`\n", def.key);

    if !def.description.is_empty() {
        let _ = writeln!(out, "{}\n", def.description);
    }

    out.push_str("| Property | Value |\n");
    out.push_str("|----------|-------|\n");
    let _ = writeln!(out, "| **Type** | {} |", def.setting_type);
    let _ = writeln!(out, "| **Default** | `{}` |", format_value(&def.default));

    if let Some(target) = &def.depends_on {
        let _ = writeln!(out, "| **Depends on** | `{target}` |");
    }
    match (def.min, def.max) {
        (Some(min), Some(max)) => {
            let _ = writeln!(out, "| **Range** | {min} - {max} |");
        }
        (Some(min), None) => {
            let _ = writeln!(out, "| **Minimum** | {min} |");
        }
        (None, Some(max)) => {
            let _ = writeln!(out, "| **Maximum** | {max} |");
        }
        (None, None) => {}
    }
    if let Some(pattern) = &def.pattern {
        let _ = writeln!(out, "| **Pattern** | `{pattern}` |");
    }

    out.push('\n');

    if let Some(source) = &def.enum_source {
        match source {
            EnumSource::Static(_) => out.push_str("**Options:**\n\n"),
            EnumSource::Dynamic(_) => out.push_str("**Options** (computed at runtime):\n\n"),
        }
        for option in source.resolve() {
            let _ = writeln!(out, "- `{option}`");
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
}

fn format_value(v: &SettingValue) -> String {
    match v {
        SettingValue::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

// =============================================================================
// Tests
// =============================================================================
