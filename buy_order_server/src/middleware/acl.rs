//! Access control list middleware.
//! This middleware can be placed on any route or service that sits behind the [`super::JwtMiddlewareFactory`].
//!
//! It reads the validated JWT claims from the request extensions and checks them against the roles the route accepts.
//! The request is allowed through if the caller holds *any* of the accepted roles, or is an admin. Otherwise a 403
//! Forbidden response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use buy_order_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let jwt_claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
                debug!("🔐️ No JWT claims found in request extensions");
                ServerError::from(AuthError::MissingToken)
            })?;
            if required_roles.iter().any(|role| jwt_claims.has_role(*role)) {
                service.call(req).await
            } else {
                info!(
                    "🔐️ Account {} ({}) tried to access {} without one of the roles {required_roles:?}",
                    jwt_claims.account_id,
                    jwt_claims.role,
                    req.path()
                );
                let roles = required_roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(" or ");
                Err(ServerError::from(AuthError::InsufficientPermissions(format!("This action requires the {roles} role")))
                    .into())
            }
        })
    }
}
