//! Seed scope matching
//!
//! A discovered URL is "in scope" for a seed when it shares the seed's
//! origin and its path sits under the seed's path. Strict matching
//! requires the boundary to fall on a `/`, so a seed of `/docs` admits
//! `/docs/setup` but not `/docs-legacy`; loose matching is a plain
//! prefix test.

use url::Url;

/// Checks whether a candidate URL falls inside a seed's crawl scope
///
/// Both URLs are expected to already be canonical (see
/// [`canonicalize`](crate::url::canonicalize)); origin comparison is an
/// exact host/port match.
///
/// # Arguments
///
/// * `candidate` - The canonical URL to test
/// * `seed` - The canonical seed URL defining the scope
/// * `strict` - Whether path matching requires a `/` boundary
pub fn is_in_scope(candidate: &Url, seed: &Url, strict: bool) -> bool {
    if candidate.host_str() != seed.host_str() || candidate.port() != seed.port() {
        return false;
    }

    path_matches(candidate.path(), seed.path(), strict)
}

/// Finds the first seed whose scope contains the candidate, if any
pub fn scope_seed<'a>(candidate: &Url, seeds: &'a [Url], strict: bool) -> Option<&'a Url> {
    seeds.iter().find(|seed| is_in_scope(candidate, seed, strict))
}

fn path_matches(candidate: &str, seed: &str, strict: bool) -> bool {
    if !strict {
        return candidate.starts_with(seed);
    }

    if candidate == seed {
        return true;
    }

    // Seed "/" is a prefix of everything and already ends on a boundary.
    if seed == "/" {
        return true;
    }

    candidate
        .strip_prefix(seed)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::canonicalize;

    fn url(s: &str) -> Url {
        canonicalize(s).unwrap()
    }

    #[test]
    fn test_same_path_is_in_scope() {
        assert!(is_in_scope(
            &url("https://example.com/docs"),
            &url("https://example.com/docs"),
            true
        ));
    }

    #[test]
    fn test_child_path_is_in_scope() {
        assert!(is_in_scope(
            &url("https://example.com/docs/setup"),
            &url("https://example.com/docs"),
            true
        ));
    }

    #[test]
    fn test_strict_rejects_sibling_prefix() {
        // /financial-apis-blog is not under /financial-apis
        assert!(!is_in_scope(
            &url("https://example.com/financial-apis-blog"),
            &url("https://example.com/financial-apis"),
            true
        ));
        assert!(is_in_scope(
            &url("https://example.com/financial-apis/x"),
            &url("https://example.com/financial-apis"),
            true
        ));
    }

    #[test]
    fn test_loose_accepts_sibling_prefix() {
        assert!(is_in_scope(
            &url("https://example.com/financial-apis-blog"),
            &url("https://example.com/financial-apis"),
            false
        ));
    }

    #[test]
    fn test_different_host_out_of_scope() {
        assert!(!is_in_scope(
            &url("https://other.com/docs/setup"),
            &url("https://example.com/docs"),
            true
        ));
    }

    #[test]
    fn test_parent_path_out_of_scope() {
        assert!(!is_in_scope(
            &url("https://example.com/"),
            &url("https://example.com/docs"),
            true
        ));
    }

    #[test]
    fn test_root_seed_matches_everything_on_host() {
        assert!(is_in_scope(
            &url("https://example.com/anything/at/all"),
            &url("https://example.com/"),
            true
        ));
    }

    #[test]
    fn test_scope_seed_returns_first_match() {
        let seeds = vec![url("https://example.com/docs"), url("https://example.com/api")];
        let hit = scope_seed(&url("https://example.com/api/v2"), &seeds, true).unwrap();
        assert_eq!(hit.path(), "/api");
        assert!(scope_seed(&url("https://example.com/blog"), &seeds, true).is_none());
    }

    #[test]
    fn test_www_and_case_collapse_before_scope_check() {
        // Canonicalization makes the hosts identical first.
        assert!(is_in_scope(
            &url("http://WWW.Example.com/docs/x"),
            &url("https://example.com/docs"),
            true
        ));
    }
}
