use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    auth::{AuthUser, TokenCodec},
    credentials::Carriers,
    error::GatewayError,
    policy::{AccessPolicy, Decision},
    routing::{RouteClass, RouteClassifier},
};

/// Identity headers written for downstream handlers. Client-supplied copies are always removed.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

pub type GatewayState = Arc<Gateway>;

/// Result of running a request through the gateway when it is allowed to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Public or unrestricted route: forwarded untouched.
    Passthrough(RouteClass),
    /// Protected route with a verified, authorized identity.
    Authenticated(AuthUser),
}

/// Gateway
///
/// Per-request authentication and authorization. Holds only read-only configuration built at
/// startup, so a single instance is shared by every concurrently handled request.
///
/// Flow for a request:
/// 1. Classify the path. Public and unrestricted routes pass straight through.
/// 2. On a protected route, pick the token from the cookie or `Authorization` header.
/// 3. Verify it with the [`TokenCodec`].
/// 4. Check the role against the [`AccessPolicy`].
///
/// Every failure is terminal: the request never reaches a downstream handler.
pub struct Gateway {
    codec: Arc<TokenCodec>,
    classifier: RouteClassifier,
    policy: AccessPolicy,
    cookie_name: String,
}

impl Gateway {
    pub fn new(
        codec: Arc<TokenCodec>,
        classifier: RouteClassifier,
        policy: AccessPolicy,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            classifier,
            policy,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn evaluate(&self, path: &str, carriers: &Carriers) -> Result<Outcome, GatewayError> {
        let class = self.classifier.classify(path);
        if class != RouteClass::Protected {
            return Ok(Outcome::Passthrough(class));
        }

        let token = carriers.extract().ok_or(GatewayError::NoCredential)?;

        let user = self.codec.decode(token).map_err(|reason| {
            tracing::debug!(path, %reason, "token rejected");
            GatewayError::InvalidCredential
        })?;

        match self.policy.authorize(path, user.role) {
            Decision::Allow => Ok(Outcome::Authenticated(user)),
            Decision::Deny => {
                tracing::debug!(path, user_id = %user.id, role = %user.role, "role not allowed");
                Err(GatewayError::InsufficientPermission)
            }
        }
    }
}

fn strip_identity_headers(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_EMAIL_HEADER);
    headers.remove(USER_ROLE_HEADER);
}

/// Converts one identity field for the downstream headers. The token has already verified at
/// this point, so a failure is logged at `warn` under its own message.
fn header_value(field: &'static str, value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value).map_err(|e| {
        tracing::warn!(
            field,
            error = %e,
            "verified identity cannot be written to request headers"
        );
        GatewayError::InvalidCredential
    })
}

fn annotate(request: &mut Request, user: AuthUser) -> Result<(), GatewayError> {
    let id = header_value("sub", &user.id)?;
    let email = header_value("email", &user.email)?;

    let headers = request.headers_mut();
    headers.insert(USER_ID_HEADER, id);
    headers.insert(USER_EMAIL_HEADER, email);
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(user.role.as_str()));

    request.extensions_mut().insert(user);
    Ok(())
}

/// gateway_middleware
///
/// Axum entry point for the [`Gateway`]. Rejections are answered here with the structured
/// JSON body; allowed requests continue to `next`, annotated with the identity when one was
/// established.
pub async fn gateway_middleware(
    State(gateway): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    strip_identity_headers(request.headers_mut());

    let path = request.uri().path().to_owned();
    let carriers = Carriers::from_headers(request.headers(), gateway.cookie_name());

    let outcome = gateway
        .evaluate(&path, &carriers)
        .and_then(|outcome| match outcome {
            Outcome::Authenticated(user) => {
                let user_id = user.id.clone();
                annotate(&mut request, user)?;
                tracing::debug!(path = %path, user_id = %user_id, "request authenticated");
                Ok(())
            }
            Outcome::Passthrough(class) => {
                tracing::trace!(path = %path, ?class, "request forwarded without authentication");
                Ok(())
            }
        });

    match outcome {
        Ok(()) => next.run(request).await,
        Err(err) => {
            // Never log the credential itself.
            tracing::warn!(
                method = %request.method(),
                path = %path,
                error = err.error_code(),
                "request rejected by gateway"
            );
            err.into_response()
        }
    }
}
