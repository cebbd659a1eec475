//! Bearer token middleware.
//!
//! Validates the `Authorization: Bearer <jwt>` header with the [`TokenIssuer`] and stores the decoded [`JwtClaims`] in
//! the request extensions. Requests without a token, or with an invalid or expired one, are answered with a 401.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::TokenIssuer,
    errors::{AuthError, ServerError},
    helpers::bearer_token,
};

pub struct JwtMiddlewareFactory {
    issuer: TokenIssuer,
}

impl JwtMiddlewareFactory {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { issuer: self.issuer.clone(), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    issuer: TokenIssuer,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
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
        let claims = match bearer_token(req.request()) {
            None => Err(AuthError::MissingToken),
            Some(token) => self.issuer.validate_token(&token),
        };
        Box::pin(async move {
            let claims = claims.map_err(|e| {
                debug!("🔐️ Rejecting request to {}. {e}", req.path());
                ServerError::from(e)
            })?;
            trace!("🔐️ Request to {} authenticated as account {}", req.path(), claims.account_id);
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
