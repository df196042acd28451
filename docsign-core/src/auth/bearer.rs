//! `Authorization` header parsing

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme match is case-insensitive. Returns `None` for any other
/// scheme or an empty token.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("BEARER   abc  "), Some("abc"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(extract_bearer_token(""), None);
        assert_eq!(extract_bearer_token("Bearer"), None);
        assert_eq!(extract_bearer_token("Bearer   "), None);
        assert_eq!(extract_bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(extract_bearer_token("Bearer a b"), None);
        assert_eq!(extract_bearer_token("abc.def.ghi"), None);
    }
}
