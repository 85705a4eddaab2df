//! File-picker style accept filters (`.pdf,application/pdf,image/*`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptRule {
    Extension(String),
    MimePrefix(String),
    Mime(String),
    Any,
}

/// A parsed accept string. Matches when any rule matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptFilter {
    source: String,
    rules: Vec<AcceptRule>,
}

impl AcceptFilter {
    pub fn parse(accept: &str) -> Self {
        let rules = accept
            .split(',')
            .map(|rule| rule.trim().to_ascii_lowercase())
            .filter(|rule| !rule.is_empty())
            .map(|rule| {
                if rule == "*" || rule == "*/*" {
                    AcceptRule::Any
                } else if let Some(ext) = rule.strip_prefix('.') {
                    AcceptRule::Extension(ext.to_string())
                } else if let Some(prefix) = rule.strip_suffix("/*") {
                    AcceptRule::MimePrefix(format!("{}/", prefix))
                } else {
                    AcceptRule::Mime(rule)
                }
            })
            .collect();

        Self {
            source: accept.to_string(),
            rules,
        }
    }

    pub fn any() -> Self {
        Self::parse("*")
    }

    pub fn matches(&self, file_name: &str, mime_type: &str) -> bool {
        let mime = mime_type.to_ascii_lowercase();
        let name = file_name.to_ascii_lowercase();

        self.rules.iter().any(|rule| match rule {
            AcceptRule::Any => true,
            AcceptRule::Extension(ext) => name
                .rsplit_once('.')
                .map_or(false, |(_, file_ext)| file_ext == ext),
            AcceptRule::MimePrefix(prefix) => mime.starts_with(prefix.as_str()),
            AcceptRule::Mime(exact) => mime == *exact,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for AcceptFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
