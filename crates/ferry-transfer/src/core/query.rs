use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// A single query value. Numeric-looking values are coerced to numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Number(f64),
    Text(String),
}

impl QueryValue {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(n) if !raw.is_empty() && n.is_finite() => QueryValue::Number(n),
            _ => QueryValue::Text(raw.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            QueryValue::Number(_) => None,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            QueryValue::Number(n) => write!(f, "{n}"),
            QueryValue::Text(s) => f.write_str(s),
        }
    }
}

/// A URL split into its base and a key → values mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUrl {
    /// Scheme, host and path, without query or fragment.
    pub base: String,
    /// `None` when the URL has no query string at all.
    pub parameters: Option<HashMap<String, Vec<QueryValue>>>,
}

impl ParsedUrl {
    pub fn values(&self, key: &str) -> &[QueryValue] {
        self.parameters
            .as_ref()
            .and_then(|p| p.get(key))
            .map_or(&[], Vec::as_slice)
    }

    pub fn first(&self, key: &str) -> Option<&QueryValue> {
        self.values(key).first()
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.values(key).is_empty()
    }

    /// True when `uploadType=resumable` is present.
    pub fn declares_resumable(&self) -> bool {
        self.values("uploadType")
            .iter()
            .filter_map(QueryValue::as_text)
            .any(|v| v.eq_ignore_ascii_case("resumable"))
    }

    /// True when the URL authenticates itself with `key=`.
    pub fn has_api_key(&self) -> bool {
        self.contains("key")
    }
}

/// Split `url` into base and query parameters.
///
/// Repeated keys accumulate their values in order of appearance. Keys and
/// values are percent-decoded and trimmed; empty keys are dropped.
///
/// # Examples
///
/// ```
/// use ferry_transfer::core::{parse_query_parameters, QueryValue};
///
/// let parsed = parse_query_parameters(
///     "https://upload.example.com/v1/files?uploadType=resumable&part=snippet,status&n=3",
/// )
/// .unwrap();
/// assert_eq!(parsed.base, "https://upload.example.com/v1/files");
/// assert!(parsed.declares_resumable());
/// assert_eq!(parsed.first("n"), Some(&QueryValue::Number(3.0)));
/// ```
pub fn parse_query_parameters(url: &str) -> Result<ParsedUrl> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("a URL including query parameters is required".into()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("'{trimmed}' is not a valid URL: {e}")))?;

    let mut base = parsed.clone();
    base.set_query(None);
    base.set_fragment(None);
    let base = base.to_string();

    if parsed.query().is_none_or(str::is_empty) {
        return Ok(ParsedUrl {
            base,
            parameters: None,
        });
    }

    let mut parameters: HashMap<String, Vec<QueryValue>> = HashMap::new();
    for (key, value) in parsed.query_pairs() {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        parameters
            .entry(key.to_string())
            .or_default()
            .push(QueryValue::parse(&value));
    }

    Ok(ParsedUrl {
        base,
        parameters: Some(parameters),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_base_and_parameters() {
        let parsed = parse_query_parameters(
            "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
        )
        .unwrap();
        assert_eq!(parsed.base, "https://www.googleapis.com/upload/youtube/v3/videos");
        assert_eq!(
            parsed.first("part"),
            Some(&QueryValue::Text("snippet,status".into()))
        );
        assert!(parsed.declares_resumable());
        assert!(!parsed.has_api_key());
    }

    #[test]
    fn repeated_keys_collect_values() {
        let parsed = parse_query_parameters("https://h.example/p?a=1&a=x&a=2.5").unwrap();
        assert_eq!(
            parsed.values("a"),
            &[
                QueryValue::Number(1.0),
                QueryValue::Text("x".into()),
                QueryValue::Number(2.5)
            ]
        );
    }

    #[test]
    fn detects_api_key() {
        let parsed = parse_query_parameters(
            "https://generativelanguage.googleapis.com/upload/v1beta/files?uploadType=resumable&key=abc123",
        )
        .unwrap();
        assert!(parsed.has_api_key());
        assert!(parsed.declares_resumable());
    }

    #[test]
    fn no_query_means_no_parameters() {
        let parsed = parse_query_parameters("https://h.example/upload").unwrap();
        assert_eq!(parsed.parameters, None);
        assert!(!parsed.declares_resumable());
        assert!(!parsed.contains("uploadType"));
    }

    #[test]
    fn other_upload_types_are_not_resumable() {
        let parsed = parse_query_parameters("https://h.example/upload?uploadType=multipart").unwrap();
        assert!(parsed.contains("uploadType"));
        assert!(!parsed.declares_resumable());
    }

    #[test]
    fn values_are_decoded_and_trimmed() {
        let parsed = parse_query_parameters("https://h.example/p?name=%20my%20file%20&empty=").unwrap();
        assert_eq!(parsed.first("name"), Some(&QueryValue::Text("my file".into())));
        assert_eq!(parsed.first("empty"), Some(&QueryValue::Text(String::new())));
    }

    #[test]
    fn non_finite_numbers_stay_text() {
        let parsed = parse_query_parameters("https://h.example/p?a=NaN&b=inf").unwrap();
        assert_eq!(parsed.first("a"), Some(&QueryValue::Text("NaN".into())));
        assert_eq!(parsed.first("b"), Some(&QueryValue::Text("inf".into())));
    }

    #[test]
    fn rejects_empty_and_relative_input() {
        assert!(matches!(parse_query_parameters(""), Err(Error::Validation(_))));
        assert!(matches!(parse_query_parameters("   "), Err(Error::Validation(_))));
        assert!(matches!(
            parse_query_parameters("/upload?uploadType=resumable"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn numbers_display_without_trailing_fraction() {
        assert_eq!(QueryValue::Number(3.0).to_string(), "3");
        assert_eq!(QueryValue::Number(2.5).to_string(), "2.5");
    }
}
