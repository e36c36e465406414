/// Checks if a host is a domain or one of its subdomains
///
/// `"example.com"` covers:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Both arguments are expected to be lowercase.
///
/// # Examples
///
/// ```
/// use siteable::url::is_within_domain;
///
/// assert!(is_within_domain("example.com", "example.com"));
/// assert!(is_within_domain("example.com", "blog.example.com"));
/// assert!(!is_within_domain("example.com", "notexample.com"));
/// assert!(!is_within_domain("example.com", "example.org"));
/// ```
pub fn is_within_domain(domain: &str, candidate: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    candidate == domain
        || candidate
            .strip_suffix(domain)
            .map(|prefix| prefix.ends_with('.') && prefix.len() > 1)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(is_within_domain("example.com", "example.com"));
        assert!(is_within_domain("127.0.0.1", "127.0.0.1"));
    }

    #[test]
    fn test_subdomains_match() {
        assert!(is_within_domain("example.com", "blog.example.com"));
        assert!(is_within_domain("example.com", "www.example.com"));
        assert!(is_within_domain("example.com", "deep.nested.sub.example.com"));
    }

    #[test]
    fn test_no_match_partial_label() {
        assert!(!is_within_domain("example.com", "myexample.com"));
        assert!(!is_within_domain("example.com", "example.com.org"));
        assert!(!is_within_domain("example.com", ".example.com"));
    }

    #[test]
    fn test_no_match_parent_domain() {
        assert!(!is_within_domain("blog.example.com", "example.com"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(!is_within_domain("", "example.com"));
        assert!(!is_within_domain("example.com", ""));
        assert!(!is_within_domain("", ""));
    }
}
