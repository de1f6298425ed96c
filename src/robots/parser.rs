//! Robots.txt parser implementation
//!
//! Allow/deny evaluation is delegated to the robotstxt crate; the
//! `Crawl-delay` extension is parsed here since that crate ignores it.

use crate::config::MAX_DELAY_SECS;
use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// An empty body means the host places no restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRobots {
    body: String,
}

/// Extracts the product token robots.txt groups are matched against
///
/// `"crawl-digest/0.1.0 (+https://x)"` becomes `"crawl-digest"`.
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or(user_agent)
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            body: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is what a host answering 404 for robots.txt gets.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Raw robots.txt text
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The full user agent string; only its product token is matched
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, product_token(user_agent), url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming our agent wins over the `*` group.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no applicable `Crawl-delay` is present
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.is_allow_all() {
            return None;
        }

        let agent = product_token(user_agent).to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.body.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    let delay = delay.min(MAX_DELAY_SECS);
                    if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        agent_delay = agent_delay.or(Some(delay));
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard_delay = wildcard_delay.or(Some(delay));
                    }
                }
                _ => in_rules = true,
            }
        }

        agent_delay.or(wildcard_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestBot/1.0 (+https://example.com/bot)";

    #[test]
    fn test_product_token() {
        assert_eq!(product_token(UA), "TestBot");
        assert_eq!(product_token("plainbot"), "plainbot");
        assert_eq!(product_token("crawl-digest/0.1.0"), "crawl-digest");
    }

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://example.com/any/path", UA));
        assert!(robots.is_allowed("https://example.com/admin", UA));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://example.com/", UA));
        assert!(!robots.is_allowed("https://example.com/page", UA));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("https://example.com/", UA));
        assert!(robots.is_allowed("https://example.com/page", UA));
        assert!(!robots.is_allowed("https://example.com/admin", UA));
        assert!(!robots.is_allowed("https://example.com/admin/users", UA));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(!robots.is_allowed("https://example.com/private", UA));
        assert!(robots.is_allowed("https://example.com/private/public", UA));
    }

    #[test]
    fn test_specific_user_agent_group() {
        let robots =
            ParsedRobots::from_content("User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed("https://example.com/page", UA));
        assert!(robots.is_allowed("https://example.com/page", "GoodBot/2.0"));
    }

    #[test]
    fn test_garbage_robots_allows() {
        let robots = ParsedRobots::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed("https://example.com/any/path", UA));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(UA), Some(10.0));
        assert_eq!(robots.crawl_delay("AnyBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: TestBot\nCrawl-delay: 5",
        );
        assert_eq!(robots.crawl_delay(UA), Some(5.0));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_after_disallow_in_group() {
        let robots =
            ParsedRobots::from_content("User-agent: TestBot\nDisallow: /x\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay(UA), Some(3.0));
    }

    #[test]
    fn test_crawl_delay_multiple_user_agents() {
        let robots = ParsedRobots::from_content("User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay("BotA"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_decimal_and_case() {
        let robots = ParsedRobots::from_content("user-agent: testbot\ncrawl-delay: 2.5");
        assert_eq!(robots.crawl_delay("TESTBOT"), Some(2.5));
    }

    #[test]
    fn test_crawl_delay_huge_value_capped() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 1e30");
        assert_eq!(robots.crawl_delay(UA), Some(MAX_DELAY_SECS));
    }

    #[test]
    fn test_crawl_delay_invalid_value_ignored() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: soon");
        assert_eq!(robots.crawl_delay(UA), None);
    }

    #[test]
    fn test_crawl_delay_none_for_allow_all() {
        assert_eq!(ParsedRobots::allow_all().crawl_delay(UA), None);
    }
}
