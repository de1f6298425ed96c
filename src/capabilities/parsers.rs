//! Platform-aware parsers applied to crawled pages before chunking

use super::{CapabilityError, CapabilityResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

/// Normalized output of a platform parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    /// Platform facts; `"platform"` names the platform when known
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ParseResult {
    /// Platform name from the metadata, if the parser set one
    pub fn platform(&self) -> Option<&str> {
        self.metadata.get("platform").and_then(Value::as_str)
    }
}

/// Recognizes pages from one platform and rewrites them
pub trait PlatformParser: Send + Sync {
    fn name(&self) -> &str;

    fn can_parse(&self, url: &str) -> bool;

    fn parse(&self, url: &str, content: &str, content_type: &str) -> CapabilityResult<ParseResult>;
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn host_in(url: &str, hosts: &[&str]) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| hosts.contains(&host.as_str()))
}

fn parse_url(url: &str) -> CapabilityResult<Url> {
    Url::parse(url).map_err(|e| CapabilityError::Processing {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Parser for crates.io crate pages
#[derive(Debug, Default, Clone, Copy)]
pub struct CratesParser;

impl PlatformParser for CratesParser {
    fn name(&self) -> &str {
        "crates"
    }

    fn can_parse(&self, url: &str) -> bool {
        host_in(url, &["crates.io", "www.crates.io"])
    }

    fn parse(&self, url: &str, content: &str, _content_type: &str) -> CapabilityResult<ParseResult> {
        let parsed = parse_url(url)?;
        let segments = path_segments(&parsed);
        let crate_name = match segments.as_slice() {
            ["crates", name, ..] => name.to_string(),
            _ => "unknown".to_string(),
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("platform".to_string(), Value::from("crates"));
        metadata.insert("crate_name".to_string(), Value::from(crate_name.clone()));

        Ok(ParseResult {
            url: url.to_string(),
            title: format!("Crates.io: {}", crate_name),
            content: format!("# {}\n\n**Crate:** [{}]({})\n\n{}", crate_name, crate_name, url, content),
            content_type: "text/markdown".to_string(),
            metadata,
            tags: vec!["rust".to_string(), "crates".to_string()],
        })
    }
}

/// Parser for GitHub repository pages
///
/// The page kind comes from the third path segment: `issues`, `pull`,
/// `blob`, `tree`, and so on. Anything shorter than `owner/repo` is kept
/// as a generic GitHub page.
#[derive(Debug, Default, Clone, Copy)]
pub struct GithubParser;

impl PlatformParser for GithubParser {
    fn name(&self) -> &str {
        "github"
    }

    fn can_parse(&self, url: &str) -> bool {
        host_in(url, &["github.com", "www.github.com"])
    }

    fn parse(&self, url: &str, content: &str, _content_type: &str) -> CapabilityResult<ParseResult> {
        let parsed = parse_url(url)?;
        let segments = path_segments(&parsed);

        let mut metadata = BTreeMap::new();
        metadata.insert("platform".to_string(), Value::from("github"));

        let (owner, repo, rest) = match segments.as_slice() {
            [owner, repo, rest @ ..] => (*owner, *repo, rest),
            _ => {
                return Ok(ParseResult {
                    url: url.to_string(),
                    title: "GitHub Page".to_string(),
                    content: content.to_string(),
                    content_type: "text/markdown".to_string(),
                    metadata,
                    tags: vec!["github".to_string()],
                });
            }
        };
        let full_name = format!("{}/{}", owner, repo);
        let repo_url = format!("https://github.com/{}", full_name);
        metadata.insert("owner".to_string(), Value::from(owner));
        metadata.insert("repository".to_string(), Value::from(repo));

        let mut tags = vec!["github".to_string()];
        let (kind, title, header) = match rest {
            [] => (
                "repository",
                full_name.clone(),
                format!("**Repository:** [{}]({})", full_name, url),
            ),
            ["issues" | "pull", number, ..] => {
                let kind = if rest[0] == "pull" { "pull_request" } else { "issue" };
                metadata.insert("number".to_string(), Value::from(*number));
                (
                    kind,
                    format!("{} #{}", full_name, number),
                    format!("**Repository:** [{}]({})\n**URL:** {}", full_name, repo_url, url),
                )
            }
            ["blob", _branch, path @ ..] if !path.is_empty() => {
                let file_path = path.join("/");
                let extension = file_path
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
                    .unwrap_or_default();
                metadata.insert("file_path".to_string(), Value::from(file_path.clone()));
                if !extension.is_empty() {
                    metadata.insert("file_extension".to_string(), Value::from(extension.clone()));
                    tags.push(extension);
                }
                (
                    "file",
                    format!("{}: {}", full_name, file_path),
                    format!("**Repository:** [{}]({})\n**File Path:** `{}`", full_name, repo_url, file_path),
                )
            }
            ["tree", _branch, path @ ..] => {
                let dir_path = if path.is_empty() { "/".to_string() } else { path.join("/") };
                metadata.insert("directory_path".to_string(), Value::from(dir_path.clone()));
                (
                    "directory",
                    format!("{}: {}", full_name, dir_path),
                    format!("**Repository:** [{}]({})\n**Path:** `{}`", full_name, repo_url, dir_path),
                )
            }
            [section, ..] => (
                *section,
                format!("{}: {}", full_name, section),
                format!("**Repository:** [{}]({})", full_name, repo_url),
            ),
        };
        metadata.insert("page_kind".to_string(), Value::from(kind));

        Ok(ParseResult {
            url: url.to_string(),
            content: format!("# {}\n\n{}\n\n{}", title, header, content),
            title,
            content_type: "text/markdown".to_string(),
            metadata,
            tags,
        })
    }
}

/// Parser for PyPI project pages
#[derive(Debug, Default, Clone, Copy)]
pub struct PypiParser;

impl PlatformParser for PypiParser {
    fn name(&self) -> &str {
        "pypi"
    }

    fn can_parse(&self, url: &str) -> bool {
        host_in(url, &["pypi.org", "www.pypi.org", "pypi.python.org"])
    }

    fn parse(&self, url: &str, content: &str, _content_type: &str) -> CapabilityResult<ParseResult> {
        let parsed = parse_url(url)?;
        let segments = path_segments(&parsed);

        let mut metadata = BTreeMap::new();
        metadata.insert("platform".to_string(), Value::from("pypi"));

        let (name, version) = match segments.as_slice() {
            ["project", name, version, ..] => (name.to_string(), Some(version.to_string())),
            ["project", name] => (name.to_string(), None),
            _ => ("unknown".to_string(), None),
        };
        metadata.insert("package_name".to_string(), Value::from(name.clone()));
        if let Some(version) = &version {
            metadata.insert("version".to_string(), Value::from(version.clone()));
        }

        Ok(package_result(url, content, &name, version.as_deref(), "PyPI", metadata, "python"))
    }
}

/// Parser for npm package pages, scoped packages included
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmParser;

impl PlatformParser for NpmParser {
    fn name(&self) -> &str {
        "npm"
    }

    fn can_parse(&self, url: &str) -> bool {
        host_in(url, &["npmjs.com", "www.npmjs.com", "npmjs.org", "www.npmjs.org"])
    }

    fn parse(&self, url: &str, content: &str, _content_type: &str) -> CapabilityResult<ParseResult> {
        let parsed = parse_url(url)?;
        let segments = path_segments(&parsed);

        let mut metadata = BTreeMap::new();
        metadata.insert("platform".to_string(), Value::from("npm"));

        let (name, rest) = match segments.as_slice() {
            ["package", scope, name, rest @ ..] if scope.starts_with('@') => {
                (format!("{}/{}", scope, name), rest)
            }
            ["package", name, rest @ ..] => (name.to_string(), rest),
            _ => ("unknown".to_string(), &[][..]),
        };
        let version = match rest {
            ["v", version, ..] => Some(version.to_string()),
            _ => None,
        };
        metadata.insert("package_name".to_string(), Value::from(name.clone()));
        if let Some(version) = &version {
            metadata.insert("version".to_string(), Value::from(version.clone()));
        }

        Ok(package_result(url, content, &name, version.as_deref(), "npm", metadata, "javascript"))
    }
}

fn package_result(
    url: &str,
    content: &str,
    name: &str,
    version: Option<&str>,
    registry: &str,
    metadata: BTreeMap<String, Value>,
    language: &str,
) -> ParseResult {
    let title = match version {
        Some(version) => format!("{} ({})", name, version),
        None => name.to_string(),
    };
    let platform = metadata
        .get("platform")
        .and_then(Value::as_str)
        .unwrap_or(registry)
        .to_string();

    ParseResult {
        url: url.to_string(),
        content: format!(
            "# {}\n\n**{} package:** [{}]({})\n\n{}",
            title, registry, name, url, content
        ),
        title,
        content_type: "text/markdown".to_string(),
        metadata,
        tags: vec![language.to_string(), platform],
    }
}

/// Ordered list of platform parsers; the first match wins
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn PlatformParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CratesParser));
        registry.register(Box::new(GithubParser));
        registry.register(Box::new(PypiParser));
        registry.register(Box::new(NpmParser));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn PlatformParser>) {
        self.parsers.push(parser);
    }

    pub fn find(&self, url: &str) -> Option<&dyn PlatformParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(url))
            .map(|p| p.as_ref())
    }

    /// Parses with the first parser that claims the URL
    #[instrument(skip(self, content))]
    pub fn parse(&self, url: &str, content: &str, content_type: &str) -> CapabilityResult<ParseResult> {
        let parser = self
            .find(url)
            .ok_or_else(|| CapabilityError::NoParser(url.to_string()))?;
        debug!("Parsing {} with {} parser", url, parser.name());
        parser.parse(url, content, content_type)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
