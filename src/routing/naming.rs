//! Identifier to path-segment conversion.
//!
//! `TestEndpoint` → `test-endpoint`, `exposedPrivate` → `exposed-private`.
//! A word starts at an uppercase ASCII letter that follows a non-uppercase
//! character; runs of capitals stay in one word (`HTTPServer` → `httpserver`).

/// Convert a mixed-case identifier into a lowercase, hyphen-separated segment.
pub fn to_path_segment(identifier: &str) -> String {
    let mut result = String::with_capacity(identifier.len() + 4);
    let mut prev_upper = false;

    for ch in identifier.chars() {
        if ch.is_ascii_uppercase() {
            if !prev_upper && !result.is_empty() {
                result.push('-');
            }
            result.push(ch.to_ascii_lowercase());
            prev_upper = true;
        } else {
            result.push(ch);
            prev_upper = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_and_pascal_case() {
        assert_eq!(to_path_segment("TestEndpoint"), "test-endpoint");
        assert_eq!(to_path_segment("exposedPrivate"), "exposed-private");
        assert_eq!(to_path_segment("ping"), "ping");
        assert_eq!(to_path_segment("testRedirect"), "test-redirect");
    }

    #[test]
    fn test_segment_count_preserved() {
        let words = ["get", "User", "Profile", "Picture"];
        let segment = to_path_segment(&words.concat());
        assert_eq!(segment, "get-user-profile-picture");
        assert_eq!(segment.split('-').count(), words.len());
    }

    #[test]
    fn test_capital_runs_stay_together() {
        assert_eq!(to_path_segment("HTTPServer"), "httpserver");
        assert_eq!(to_path_segment("userID"), "user-id");
    }

    #[test]
    fn test_non_letters_pass_through() {
        assert_eq!(to_path_segment("_private"), "_private");
        assert_eq!(to_path_segment("v2Api"), "v2-api");
        assert_eq!(to_path_segment(""), "");
    }
}
