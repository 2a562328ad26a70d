//! Query parameters of a Get

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{XlateError, XlateResult};

/// `content` query parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    All,
    Config,
    /// State data, including state mirroring configuration
    NonConfig,
    /// State data with no configured counterpart
    Operational,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::All => "all",
            ContentKind::Config => "config",
            ContentKind::NonConfig => "nonconfig",
            ContentKind::Operational => "operational",
        }
    }

    pub fn wants_state(&self) -> bool {
        matches!(self, ContentKind::NonConfig | ContentKind::Operational)
    }
}

impl FromStr for ContentKind {
    type Err = XlateError;

    fn from_str(s: &str) -> XlateResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ContentKind::All),
            "config" => Ok(ContentKind::Config),
            "nonconfig" => Ok(ContentKind::NonConfig),
            "operational" => Ok(ContentKind::Operational),
            other => Err(XlateError::invalid_args(format!(
                "Invalid content query parameter '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-request query parameters; read-only once built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParameters {
    /// Levels below and including the target; 0 is unlimited
    pub depth: u32,
    pub content: ContentKind,
    /// Relative paths to project
    pub fields: Vec<String>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_content(mut self, content: ContentKind) -> Self {
        self.content = content;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Build from raw query strings. `depth` accepts `unbounded`; each
    /// `fields` entry may hold several paths separated by `;` or `,`.
    pub fn parse(depth: Option<&str>, content: Option<&str>, fields: &[String]) -> XlateResult<Self> {
        let depth = match depth {
            None => 0,
            Some(d) if d.eq_ignore_ascii_case("unbounded") => 0,
            Some(d) => d.trim().parse::<u32>().map_err(|_| {
                XlateError::invalid_args(format!("Invalid depth query parameter '{}'", d))
            })?,
        };
        let content = content.map(ContentKind::from_str).transpose()?.unwrap_or_default();

        let mut paths = Vec::new();
        for entry in fields {
            for part in entry.split([';', ',']) {
                let part = part.trim().trim_matches('/');
                if !part.is_empty() {
                    paths.push(part.to_string());
                }
            }
        }

        Ok(Self {
            depth,
            content,
            fields: paths,
        })
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
