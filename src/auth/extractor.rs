// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for administrative requests.
//!
//! Use the `AdminOnly` extractor in handlers to require an administrator:
//!
//! ```rust,ignore
//! async fn my_handler(AdminOnly(identity): AdminOnly) -> impl IntoResponse {
//!     // identity is an allow-listed Identity
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthRejection, AuthorizationGate, CredentialResolver, Identity};

/// Application state able to authenticate and authorize requests.
pub trait AdminAuth {
    fn resolver(&self) -> &CredentialResolver;
    fn gate(&self) -> &AuthorizationGate;
}

/// Pull the bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Extractor that requires an allow-listed administrator.
///
/// Resolves the bearer credential and runs the authorization gate on every
/// request; no decision outlives the request it was made for.
pub struct AdminOnly(pub Identity);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: AdminAuth + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = state.gate();
        let reject = |error: AuthError| AuthRejection {
            error,
            sign_in_path: gate.sign_in_path().to_string(),
        };

        let token = bearer_token(&parts.headers).map_err(reject)?;
        let identity = state.resolver().resolve(token).await.map_err(reject)?;

        gate.authorize(Some(&identity)).into_result().map_err(|error| {
            tracing::warn!(
                user_id = %identity.user_id,
                "Authenticated operator is not an administrator"
            );
            reject(error)
        })?;

        Ok(AdminOnly(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver::test_tokens::unsigned_valid;
    use crate::auth::{AdminAllowList, TokenVerifier};
    use axum::http::Request;

    struct TestState {
        resolver: CredentialResolver,
        gate: AuthorizationGate,
    }

    impl AdminAuth for TestState {
        fn resolver(&self) -> &CredentialResolver {
            &self.resolver
        }

        fn gate(&self) -> &AuthorizationGate {
            &self.gate
        }
    }

    fn state() -> TestState {
        TestState {
            resolver: CredentialResolver::new(TokenVerifier::development()),
            gate: AuthorizationGate::new(AdminAllowList::parse("admin@example.com"), "/login"),
        }
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/licenses");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingAuthHeader));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidAuthHeader));

        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidAuthHeader));

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc.def.ghi"));
    }

    #[tokio::test]
    async fn admin_only_requires_auth_header() {
        let state = state();
        let result = AdminOnly::from_request_parts(&mut parts(None), &state).await;
        let rejection = result.err().unwrap();
        assert_eq!(rejection.error, AuthError::MissingAuthHeader);
        assert_eq!(rejection.sign_in_path, "/login");
    }

    #[tokio::test]
    async fn admin_only_accepts_listed_email_any_case() {
        let state = state();
        let header = format!("Bearer {}", unsigned_valid("Admin@Example.COM"));
        let result = AdminOnly::from_request_parts(&mut parts(Some(&header)), &state).await;
        let AdminOnly(identity) = result.ok().unwrap();
        assert_eq!(identity.user_id, "user_123");
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let state = state();
        let header = format!("Bearer {}", unsigned_valid("someone@example.com"));
        let result = AdminOnly::from_request_parts(&mut parts(Some(&header)), &state).await;
        assert_eq!(result.err().unwrap().error, AuthError::NotAdministrator);
    }

    #[tokio::test]
    async fn admin_only_rejects_malformed_token() {
        let state = state();
        let result =
            AdminOnly::from_request_parts(&mut parts(Some("Bearer nope")), &state).await;
        assert_eq!(result.err().unwrap().error, AuthError::MalformedToken);
    }
}
