/// RouteMatcher
///
/// Ordered path matching. Implementations return the index of the first entry, in declaration
/// order, that matches `path`. The classifier and the access policy only depend on this trait,
/// so a radix or trie matcher can replace [`PrefixList`] without touching their logic.
pub trait RouteMatcher: Send + Sync {
    fn first_match(&self, path: &str) -> Option<usize>;

    fn matches(&self, path: &str) -> bool {
        self.first_match(path).is_some()
    }
}

/// PrefixList
///
/// Literal prefix matching over an ordered list. An entry ending in `*` matches on the text
/// before the `*`; every other entry matches itself and anything it prefixes.
#[derive(Debug, Clone, Default)]
pub struct PrefixList {
    prefixes: Vec<String>,
}

impl PrefixList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl RouteMatcher for PrefixList {
    fn first_match(&self, path: &str) -> Option<usize> {
        self.prefixes.iter().position(|entry| {
            let prefix = entry.strip_suffix('*').unwrap_or(entry);
            path.starts_with(prefix)
        })
    }
}

/// Public routes bypass authentication entirely.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &[
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/auth/logout",
    "/api/public",
    "/_next",
    "/favicon.ico",
];

/// Protected routes require a verified credential.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &[
    "/api/solicitudes",
    "/api/users",
    "/api/reportes",
    "/api/respuestas",
    "/api/private",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
    Unrestricted,
}

/// True for requests that serve static files: the favicon, build assets under `/_next/`, or any
/// path whose last segment carries a file extension.
pub fn is_static_asset(path: &str) -> bool {
    if path == "/favicon.ico" || path.starts_with("/_next/") {
        return true;
    }
    path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

/// RouteClassifier
///
/// Decides, from the path alone, whether a request is public, protected, or unrestricted.
/// Static assets short-circuit to unrestricted; otherwise public is checked before protected.
pub struct RouteClassifier {
    public: Box<dyn RouteMatcher>,
    protected: Box<dyn RouteMatcher>,
}

impl RouteClassifier {
    pub fn new(public: impl RouteMatcher + 'static, protected: impl RouteMatcher + 'static) -> Self {
        Self {
            public: Box::new(public),
            protected: Box::new(protected),
        }
    }

    pub fn with_default_routes() -> Self {
        Self::new(
            PrefixList::new(DEFAULT_PUBLIC_PREFIXES.iter().copied()),
            PrefixList::new(DEFAULT_PROTECTED_PREFIXES.iter().copied()),
        )
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if is_static_asset(path) {
            RouteClass::Unrestricted
        } else if self.public.matches(path) {
            RouteClass::Public
        } else if self.protected.matches(path) {
            RouteClass::Protected
        } else {
            RouteClass::Unrestricted
        }
    }
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::with_default_routes()
    }
}
