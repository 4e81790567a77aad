use crate::UrlError;
use url::Url;

/// Canonicalizes a URL according to driftnet's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Force the `https` scheme (http:// becomes https://)
/// 3. Lowercase the host
/// 4. Remove the `www.` prefix from the host
/// 5. Strip default ports (80/443)
/// 6. Remove trailing slash from the path (except for the root `/`)
/// 7. Remove the fragment
/// 8. Remove the query string entirely
///
/// Dropping the whole query string is deliberate: documentation URLs
/// rarely encode distinct content in query parameters, and folding them
/// away maximizes dedupe.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - The input is unparsable or not an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use driftnet::url::canonicalize;
///
/// let url = canonicalize("HTTP://WWW.Example.com/Docs/").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/Docs");
/// ```
pub fn canonicalize(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Force https before touching the host so the url crate drops the
    // default port for us.
    url.set_scheme("https")
        .map_err(|_| UrlError::Malformed("Failed to set https scheme".to_string()))?;

    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();
        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }
        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingHost);
    }

    if url.port() == Some(443) || url.port() == Some(80) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to strip default port".to_string()))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

/// Normalizes a URL path: collapses empty/dot segments and removes the
/// trailing slash unless the path is the root
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
