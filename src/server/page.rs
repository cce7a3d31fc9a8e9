use std::path::PathBuf;

use secrecy::ExposeSecret;

use crate::config::Config;

const BUILTIN_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Source of the HTML served on `/`.
pub enum PageTemplate {
    Builtin,
    /// Re-read on every request so the page can be edited without a restart.
    File(PathBuf),
}

impl PageTemplate {
    pub fn new(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Builtin, Self::File)
    }

    pub async fn render(&self, config: &Config) -> std::io::Result<String> {
        let template = match self {
            Self::Builtin => BUILTIN_TEMPLATE.to_string(),
            Self::File(path) => tokio::fs::read_to_string(path).await?,
        };
        Ok(fill_template(&template, config))
    }
}

/// Replaces `{{BaseUrl}}`, `{{BasePort}}` and `{{Password}}` with escaped config values.
pub fn fill_template(template: &str, config: &Config) -> String {
    template
        .replace("{{BaseUrl}}", &escape_html(&config.base_url))
        .replace("{{BasePort}}", &escape_html(&config.base_port))
        .replace("{{Password}}", &escape_html(config.password.expose_secret()))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
