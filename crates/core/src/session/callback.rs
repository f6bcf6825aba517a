//! OAuth callback handling
//!
//! The OAuth provider redirects back to `/auth/callback?token=...` or
//! `/auth/callback?error=...`. The query is read once and the location is
//! reset to `/` straight away so the token does not linger in history.

use tracing::warn;

use super::store::Credential;

pub const CALLBACK_PATH: &str = "/auth/callback";

/// Path and query of the address the client was opened at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: String,
}

impl Default for Location {
    fn default() -> Self {
        Self::root()
    }
}

impl Location {
    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
            query: String::new(),
        }
    }

    /// Accepts either a full URL or a path with an optional query
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let without_fragment = raw.split_once('#').map_or(raw, |(head, _)| head);
        let path_and_query = match without_fragment.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
            None => without_fragment,
        };
        let (path, query) = path_and_query
            .split_once('?')
            .unwrap_or((path_and_query, ""));
        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_callback(&self) -> bool {
        self.path.trim_end_matches('/') == CALLBACK_PATH
    }

    /// Consume the callback, if this is one, and reset to `/`.
    pub fn take_callback(&mut self) -> Option<CallbackOutcome> {
        if !self.is_callback() {
            return None;
        }
        let outcome = CallbackOutcome::from_query(&self.query);
        *self = Self::root();
        Some(outcome)
    }
}

/// What the OAuth provider reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Token(Credential),
    Error(String),
    /// Neither `token` nor `error` was present
    Empty,
}

impl CallbackOutcome {
    pub fn from_query(query: &str) -> Self {
        let mut token = None;
        let mut error = None;
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match key {
                "token" if !value.is_empty() => token = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }

        match (token, error) {
            (Some(token), _) => Self::Token(Credential::new(token)),
            (None, Some(error)) => Self::Error(error),
            (None, None) => Self::Empty,
        }
    }
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Malformed callback parameter: {}", e);
            spaced
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let location = Location::parse("https://app.example.com/auth/callback?token=abc#top");
        assert_eq!(location.path(), "/auth/callback");
        assert_eq!(location.query(), "token=abc");
        assert!(location.is_callback());
    }

    #[test]
    fn test_token_callback_consumed_once() {
        let mut location = Location::parse("/auth/callback?token=abc%2Edef");
        let outcome = location.take_callback();
        assert_eq!(outcome, Some(CallbackOutcome::Token(Credential::new("abc.def"))));
        assert_eq!(location, Location::root());
        assert_eq!(location.take_callback(), None);
    }

    #[test]
    fn test_error_callback() {
        let mut location = Location::parse("/auth/callback?error=access_denied");
        assert_eq!(
            location.take_callback(),
            Some(CallbackOutcome::Error("access_denied".into()))
        );
        assert_eq!(location.query(), "");
    }

    #[test]
    fn test_token_wins_over_error() {
        assert_eq!(
            CallbackOutcome::from_query("error=x&token=t"),
            CallbackOutcome::Token(Credential::new("t"))
        );
        assert_eq!(CallbackOutcome::from_query("token="), CallbackOutcome::Empty);
    }

    #[test]
    fn test_other_paths_are_not_callbacks() {
        let mut location = Location::parse("/dashboard?token=abc");
        assert_eq!(location.take_callback(), None);
        assert_eq!(location.query(), "token=abc");
    }
}
