use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service::{resolve_identity, Caller};
use crate::state::AppState;

/// Resolves the bearer token into a [`Caller`] stored in the request extensions.
///
/// Never rejects: a missing or invalid token yields an anonymous caller and the
/// operation's own guard decides.
pub struct IdentityMiddleware;

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService { service }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: S,
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = match (bearer_token(&req), req.app_data::<web::Data<AppState>>()) {
            (Some(token), Some(state)) => resolve_identity(&state.config, token),
            _ => None,
        };

        let caller = identity.map_or_else(Caller::anonymous, Caller::authenticated);
        req.extensions_mut().insert(caller);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
