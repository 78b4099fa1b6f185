use axum::http::{HeaderMap, header};
use cookie::Cookie;

const BEARER_PREFIX: &str = "Bearer ";

/// Carriers
///
/// The two places a bearer credential can arrive on: the `Authorization` header value and the
/// value of the auth cookie. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Carriers {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

impl Carriers {
    pub fn new(authorization: Option<&str>, cookie: Option<&str>) -> Self {
        Self {
            authorization: authorization.map(str::to_owned),
            cookie: cookie.map(str::to_owned),
        }
    }

    /// Collects both carriers from request headers. Every `Cookie` header line is scanned for
    /// `cookie_name`; values that are not valid UTF-8 are ignored.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| Cookie::split_parse(raw))
            .filter_map(Result::ok)
            .find(|c| c.name() == cookie_name)
            .map(|c| c.value().to_owned());

        Self {
            authorization,
            cookie,
        }
    }

    /// Picks exactly one token. The cookie wins when both carriers hold one; the header only
    /// counts when it uses the `Bearer ` scheme. Empty values are treated as absent.
    pub fn extract(&self) -> Option<&str> {
        let from_cookie = self.cookie.as_deref().filter(|t| !t.is_empty());
        let from_header = self
            .authorization
            .as_deref()
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .filter(|t| !t.is_empty());

        from_cookie.or(from_header)
    }
}
