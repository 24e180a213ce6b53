//! Bearer token middleware.
//!
//! Verifies the `Authorization: Bearer <jwt>` header on every request that passes through it. Valid claims are placed
//! in the request extensions, where handlers (via the [`JwtClaims`] extractor) and the ACL middleware pick them up.
//! Requests without a valid token are answered with 401 and never reach the wrapped service.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::ServerError,
};

pub struct AuthenticationMiddlewareFactory {
    verifier: TokenVerifier,
}

impl AuthenticationMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        AuthenticationMiddlewareFactory { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AuthenticationMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddlewareService { verifier: self.verifier.clone(), service: Rc::new(service) }))
    }
}

pub struct AuthenticationMiddlewareService<S> {
    verifier: TokenVerifier,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let claims = self.verifier.verify_header(req.headers().get(AUTHORIZATION));
        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    trace!("💻️ Authenticated user {} ({}) for {}", claims.id, claims.role, req.path());
                    req.extensions_mut().insert::<JwtClaims>(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("💻️ Rejecting unauthenticated request to {}. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
