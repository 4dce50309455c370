//! Bearer-token authentication and role gates.
//!
//! `Authentication` must wrap any scope that uses `RequireRole` or the
//! `CurrentUser` extractor. In actix the last `.wrap()` runs first, so
//! register it after the role gates:
//!
//! ```ignore
//! web::scope("/admin")
//!     .wrap(RequireRole::admin())
//!     .wrap(Authentication)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ok, ready, Ready};
use log::warn;

use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::Role;

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Accepts `Bearer <token>` or the raw token value.
fn extract_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

fn authenticate(req: &ServiceRequest) -> Result<Identity, ApiError> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .filter(|value| !value.as_bytes().trim_ascii().is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("AppState missing from app data".to_string()))?;

    let token = header
        .to_str()
        .map(extract_token)
        .map_err(|_| ApiError::Forbidden("Invalid token".to_string()))?;

    match state.auth.keys().verify(token) {
        Ok(claims) => Ok(Identity::from(claims)),
        Err(e) => {
            warn!("Rejected token on {}: {}", req.path(), e);
            Err(ApiError::Forbidden("Invalid token".to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_boxed_body())
                })
            }
            Err(err) => {
                let resp = err.error_response();
                Box::pin(async move { Ok(req.into_response(resp)) })
            }
        }
    }
}

/// Role gate. Runs after `Authentication` and answers 403 when the
/// caller's role is not the required one.
#[derive(Debug, Clone, Copy)]
pub struct RequireRole {
    role: Role,
}

pub fn requires(role: Role) -> RequireRole {
    RequireRole { role }
}

impl RequireRole {
    pub fn admin() -> Self {
        requires(Role::Admin)
    }

    pub fn customer() -> Self {
        requires(Role::Customer)
    }

    /// The predicate itself, usable outside the middleware too.
    pub fn check(&self, identity: Option<&Identity>) -> Result<(), ApiError> {
        match identity {
            None => Err(ApiError::Unauthorized("No token provided".to_string())),
            Some(id) if id.role == self.role => Ok(()),
            Some(_) => Err(ApiError::Forbidden(match self.role {
                Role::Admin => "Admin access required".to_string(),
                Role::Customer => "Customer access required".to_string(),
            })),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = RoleMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RoleMiddleware {
            service,
            gate: *self,
        })
    }
}

pub struct RoleMiddleware<S> {
    service: S,
    gate: RequireRole,
}

impl<S, B> Service<ServiceRequest> for RoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verdict = self.gate.check(req.extensions().get::<Identity>());
        match verdict {
            Ok(()) => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_boxed_body())
                })
            }
            Err(err) => {
                let resp = err.error_response();
                Box::pin(async move { Ok(req.into_response(resp)) })
            }
        }
    }
}

/// Handler argument for the authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .map(CurrentUser)
                .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::config::Config;
    use crate::models::User;
    use actix_web::{test, App, HttpResponse};
    use chrono::Utc;
    use serde_json::Value;

    async fn whoami(CurrentUser(me): CurrentUser) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "id": me.id, "role": me.role }))
    }

    fn test_state() -> AppState {
        AppState::in_memory(Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("middleware-test".to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        }))
    }

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: format!("{}-1", role),
            email: format!("{}@example.com", role),
            password_hash: String::new(),
            name: role.to_string(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .service(
                        web::scope("/me")
                            .wrap(Authentication)
                            .route("", web::get().to(whoami)),
                    )
                    .service(
                        web::scope("/admin")
                            .wrap(RequireRole::admin())
                            .wrap(Authentication)
                            .route("", web::get().to(whoami)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_header_is_401() {
        let app = app!(test_state());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), 401);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No token provided");
    }

    #[actix_web::test]
    async fn blank_header_counts_as_missing() {
        let app = app!(test_state());
        for blank in ["", "   "] {
            let req = test::TestRequest::get()
                .uri("/me")
                .insert_header(("Authorization", blank))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 401);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "No token provided");
        }
    }

    #[actix_web::test]
    async fn garbage_token_is_403() {
        let app = app!(test_state());
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", "Bearer not.a.jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid token");
    }

    #[actix_web::test]
    async fn bearer_and_raw_tokens_both_work() {
        let state = test_state();
        let token = state.auth.keys().sign(&user(Role::Customer)).unwrap();
        let app = app!(state);

        for header in [format!("Bearer {}", token), token.clone()] {
            let req = test::TestRequest::get()
                .uri("/me")
                .insert_header(("Authorization", header))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 200);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["id"], "customer-1");
        }
    }

    #[actix_web::test]
    async fn role_gate_rejects_other_roles() {
        let state = test_state();
        let customer = state.auth.keys().sign(&user(Role::Customer)).unwrap();
        let admin = state.auth.keys().sign(&user(Role::Admin)).unwrap();
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", customer)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Admin access required");

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", admin)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[core::prelude::v1::test]
    fn role_predicate_without_identity_is_401() {
        let err = RequireRole::customer().check(None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
