//! Robots.txt parser implementation
//!
//! Allow/deny matching is delegated to the robotstxt crate. The pure
//! extractor in this module pulls out what that matcher does not expose:
//! the group's rule lists, `Crawl-delay` and `Sitemap:` directives. It never
//! performs I/O and never fails. Anything it does not understand is ignored.

use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::Duration;

/// Politeness rules for a single host
///
/// Produced once per host by [`parse_robots`] (or [`PolicyRule::allow_all`]
/// when robots.txt is missing) and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    /// Path patterns explicitly allowed for our user-agent group
    pub allow: Vec<String>,

    /// Path patterns disallowed for our user-agent group
    pub disallow: Vec<String>,

    /// Delay to observe between fetches to this host
    pub crawl_delay: Duration,

    /// Sitemap URLs announced via `Sitemap:` directives
    pub sitemap_urls: Vec<String>,

    /// Raw robots.txt body handed to the matcher; `None` allows everything
    robots_txt: Option<Arc<str>>,

    /// Product token the matcher selects groups with
    agent: String,
}

impl PolicyRule {
    /// Creates a permissive rule that allows everything
    ///
    /// This is used when robots.txt cannot be fetched, returns an error
    /// status, or has no group that applies to us.
    pub fn allow_all(default_delay: Duration) -> Self {
        Self {
            allow: Vec::new(),
            disallow: Vec::new(),
            crawl_delay: default_delay,
            sitemap_urls: Vec::new(),
            robots_txt: None,
            agent: String::new(),
        }
    }

    /// Checks if a path (including any query string) may be fetched
    ///
    /// Matching follows the robots exclusion standard: the most specific
    /// (longest) matching rule decides, a tie goes to `Allow`, and patterns
    /// may use `*` anywhere and a trailing `$` anchor.
    pub fn is_allowed(&self, path: &str) -> bool {
        let Some(content) = self.robots_txt.as_deref() else {
            return true;
        };

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(content, &self.agent, path)
    }

    /// Returns the delay to apply after each fetch to this host
    pub fn delay_for(&self) -> Duration {
        self.crawl_delay
    }
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<Duration>,
}

impl Group {
    fn has_rules(&self) -> bool {
        !self.allow.is_empty() || !self.disallow.is_empty() || self.crawl_delay.is_some()
    }
}

/// Parses robots.txt content into the rule that applies to `user_agent`
///
/// Group selection, in order:
/// 1. a group naming our product token exactly (case-insensitive)
/// 2. a group whose agent name appears inside our user-agent string
/// 3. the wildcard `*` group
///
/// If no group applies the result allows everything. `default_delay` is
/// used when the chosen group has no `Crawl-delay`.
///
/// # Example
///
/// ```
/// use siteable::robots::parse_robots;
/// use std::time::Duration;
///
/// let rule = parse_robots("User-agent: *\nDisallow: /admin\nCrawl-delay: 2", "TestBot/1.0", Duration::ZERO);
/// assert!(!rule.is_allowed("/admin/users"));
/// assert!(rule.is_allowed("/"));
/// assert_eq!(rule.delay_for(), Duration::from_secs(2));
/// ```
pub fn parse_robots(content: &str, user_agent: &str, default_delay: Duration) -> PolicyRule {
    let mut groups: Vec<Group> = Vec::new();
    let mut current = Group::default();
    let mut sitemap_urls = Vec::new();

    for raw in content.lines() {
        let line = match raw.split_once('#') {
            Some((before, _)) => before.trim(),
            None => raw.trim(),
        };
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                // Consecutive User-agent lines share one group
                if current.has_rules() {
                    groups.push(std::mem::take(&mut current));
                }
                current.agents.push(value.to_lowercase());
            }
            "disallow" => {
                if !value.is_empty() {
                    current.disallow.push(value.to_string());
                }
            }
            "allow" => {
                if !value.is_empty() {
                    current.allow.push(value.to_string());
                }
            }
            "crawl-delay" => {
                if let Some(delay) = parse_delay(value) {
                    current.crawl_delay = Some(delay);
                }
            }
            "sitemap" => {
                if !value.is_empty() {
                    sitemap_urls.push(value.to_string());
                }
            }
            _ => {}
        }
    }
    if !current.agents.is_empty() || current.has_rules() {
        groups.push(current);
    }

    let mut rule = match select_group(&groups, user_agent) {
        Some(group) => PolicyRule {
            allow: group.allow.clone(),
            disallow: group.disallow.clone(),
            crawl_delay: group.crawl_delay.unwrap_or(default_delay),
            sitemap_urls: Vec::new(),
            robots_txt: Some(Arc::from(content)),
            agent: product_token(user_agent).to_string(),
        },
        None => PolicyRule::allow_all(default_delay),
    };
    rule.sitemap_urls = sitemap_urls;
    rule
}

/// The product token of a User-Agent header, e.g. `TestBot` in `TestBot/1.0 (+url)`
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
}

fn select_group<'a>(groups: &'a [Group], user_agent: &str) -> Option<&'a Group> {
    let ua_lower = user_agent.to_lowercase();
    let product = product_token(&ua_lower);

    groups
        .iter()
        .find(|g| g.agents.iter().any(|a| a == product || *a == ua_lower))
        .or_else(|| {
            groups.iter().find(|g| {
                g.agents
                    .iter()
                    .any(|a| !a.is_empty() && a != "*" && ua_lower.contains(a.as_str()))
            })
        })
        .or_else(|| groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
}

fn parse_delay(value: &str) -> Option<Duration> {
    let secs = value.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestBot/1.0 (+https://example.com/bot)";

    fn parse(content: &str) -> PolicyRule {
        parse_robots(content, UA, Duration::ZERO)
    }

    #[test]
    fn test_allow_all() {
        let rule = PolicyRule::allow_all(Duration::ZERO);
        assert!(rule.is_allowed("/any/path"));
        assert!(rule.is_allowed("/admin"));
    }

    #[test]
    fn test_parse_disallow_all() {
        let rule = parse("User-agent: *\nDisallow: /");
        assert!(!rule.is_allowed("/"));
        assert!(!rule.is_allowed("/page"));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let rule = parse("User-agent: *\nDisallow: /admin");
        assert!(rule.is_allowed("/"));
        assert!(rule.is_allowed("/page"));
        assert!(!rule.is_allowed("/admin"));
        assert!(!rule.is_allowed("/admin/users"));
    }

    #[test]
    fn test_longest_match_wins() {
        let rule = parse("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(rule.is_allowed("/"));
        assert!(!rule.is_allowed("/private"));
        assert!(!rule.is_allowed("/private/secret"));
        assert!(rule.is_allowed("/private/public"));
        assert!(rule.is_allowed("/private/public/page"));
    }

    #[test]
    fn test_longer_disallow_beats_shorter_allow() {
        let rule = parse("User-agent: *\nAllow: /docs\nDisallow: /docs/internal");
        assert!(rule.is_allowed("/docs/guide"));
        assert!(!rule.is_allowed("/docs/internal/x"));
    }

    #[test]
    fn test_tie_goes_to_allow() {
        let rule = parse("User-agent: *\nDisallow: /same\nAllow: /same");
        assert!(rule.is_allowed("/same"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let rule = parse("User-agent: *\nDisallow:");
        assert!(rule.is_allowed("/anything"));
    }

    #[test]
    fn test_query_string_is_part_of_path() {
        let rule = parse("User-agent: *\nDisallow: /search?");
        assert!(rule.is_allowed("/search"));
        assert!(!rule.is_allowed("/search?q=x"));
    }

    #[test]
    fn test_trailing_wildcard_is_prefix() {
        let rule = parse("User-agent: *\nDisallow: /tmp*");
        assert!(!rule.is_allowed("/tmpfile"));
        assert!(rule.is_allowed("/other"));
    }

    #[test]
    fn test_wildcard_inside_pattern() {
        let rule = parse("User-agent: *\nDisallow: /*?sort=");
        assert!(!rule.is_allowed("/list?sort=asc"));
        assert!(!rule.is_allowed("/a/b?sort=desc"));
        assert!(rule.is_allowed("/list?page=2"));
    }

    #[test]
    fn test_end_anchor() {
        let rule = parse("User-agent: *\nDisallow: /*.pdf$");
        assert!(!rule.is_allowed("/docs/a.pdf"));
        assert!(rule.is_allowed("/docs/a.pdf.html"));
        assert!(rule.is_allowed("/docs/"));
    }

    #[test]
    fn test_extracted_lists_exposed() {
        let rule = parse("User-agent: *\nDisallow: /a\nAllow: /a/b\nDisallow: /*.pdf$");
        assert_eq!(rule.disallow, vec!["/a".to_string(), "/*.pdf$".to_string()]);
        assert_eq!(rule.allow, vec!["/a/b".to_string()]);
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token(UA), "TestBot");
        assert_eq!(product_token("Plain"), "Plain");
    }

    #[test]
    fn test_specific_user_agent_preferred() {
        let content = "User-agent: TestBot\nDisallow: /only-testbot\n\nUser-agent: *\nDisallow: /";
        let rule = parse(content);
        assert!(rule.is_allowed("/page"));
        assert!(!rule.is_allowed("/only-testbot"));
    }

    #[test]
    fn test_other_agent_group_ignored() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let rule = parse(content);
        assert!(rule.is_allowed("/page"));
    }

    #[test]
    fn test_no_applicable_group_allows_all() {
        let rule = parse("User-agent: BadBot\nDisallow: /");
        assert!(rule.is_allowed("/page"));
    }

    #[test]
    fn test_multiple_user_agents_share_group() {
        let content = "User-agent: BotA\nUser-agent: TestBot\nDisallow: /shared\nCrawl-delay: 3";
        let rule = parse(content);
        assert!(!rule.is_allowed("/shared"));
        assert_eq!(rule.delay_for(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_robots_txt() {
        let rule = parse("This is not valid robots.txt {{{");
        assert!(rule.is_allowed("/any/path"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let rule = parse("");
        assert!(rule.is_allowed("/any/path"));
        assert_eq!(rule.delay_for(), Duration::ZERO);
    }

    #[test]
    fn test_comments_are_stripped() {
        let rule = parse("# hello\nUser-agent: * # everyone\nDisallow: /x # not this");
        assert!(!rule.is_allowed("/x"));
        assert!(rule.is_allowed("/y"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let rule = parse("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(rule.delay_for(), Duration::from_secs(10));
    }

    #[test]
    fn test_crawl_delay_decimal() {
        let rule = parse("User-agent: *\nCrawl-delay: 2.5");
        assert_eq!(rule.delay_for(), Duration::from_millis(2500));
    }

    #[test]
    fn test_crawl_delay_case_insensitive() {
        let rule = parse("user-agent: testbot\ncrawl-delay: 7");
        assert_eq!(rule.delay_for(), Duration::from_secs(7));
    }

    #[test]
    fn test_crawl_delay_falls_back_to_default() {
        let rule = parse_robots("User-agent: *\nDisallow: /admin", UA, Duration::from_secs(1));
        assert_eq!(rule.delay_for(), Duration::from_secs(1));
    }

    #[test]
    fn test_crawl_delay_garbage_ignored() {
        let rule = parse("User-agent: *\nCrawl-delay: soon\nCrawl-delay: -4");
        assert_eq!(rule.delay_for(), Duration::ZERO);
    }

    #[test]
    fn test_sitemap_directives_collected_outside_groups() {
        let content = "Sitemap: https://example.com/s1.xml\nUser-agent: BadBot\nDisallow: /\nSitemap: https://example.com/s2.xml";
        let rule = parse(content);
        assert_eq!(
            rule.sitemap_urls,
            vec![
                "https://example.com/s1.xml".to_string(),
                "https://example.com/s2.xml".to_string()
            ]
        );
    }
}
