//! Security headers added to every response.

use axum::http::HeaderValue;
use axum::http::header::HeaderName;
use tower_http::set_header::SetResponseHeaderLayer;

/// Content-Security-Policy header value.
///
/// Rendered guides may embed remote images, but never scripts.
const CSP: &str = "default-src 'self'; \
                   script-src 'self'; \
                   style-src 'self' 'unsafe-inline'; \
                   img-src 'self' data: https:; \
                   frame-ancestors 'none'";

/// Header names and values, applied in order.
const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("content-security-policy", CSP),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "same-origin"),
];

/// One layer per security header, each overriding any value set by a handler.
pub(crate) fn layers() -> impl Iterator<Item = SetResponseHeaderLayer<HeaderValue>> {
    SECURITY_HEADERS.into_iter().map(|(name, value)| {
        SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_blocks_remote_scripts() {
        assert!(CSP.contains("script-src 'self';"));
        assert!(CSP.contains("img-src 'self' data: https:"));
        assert!(CSP.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_header_names_are_lowercase() {
        for (name, _) in SECURITY_HEADERS {
            assert_eq!(name, name.to_ascii_lowercase());
        }
        assert_eq!(layers().count(), SECURITY_HEADERS.len());
    }
}
