//! Body signature checks for storefront webhooks.
//!
//! Storefronts sign each webhook body with a shared secret and send the base64 HMAC-SHA256 in a header
//! (`X-Shopify-Hmac-SHA256` for Shopify). The middleware buffers the body, checks it against that header, and puts it
//! back for the route to read. A failed check is an [`AuthError::InvalidSignature`], which the server answers with 401.
//!
//! With no secret configured, every call is rejected. Checks can only be switched off explicitly, for local testing.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    web,
    Error,
};
use bo_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::calculate_hmac,
};

/// The header carrying the signature, and the secret it is made with.
struct SignatureCheck {
    header: String,
    secret: Secret<String>,
}

impl SignatureCheck {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let secret = self.secret.reveal();
        if secret.is_empty() {
            return Err(AuthError::InvalidSignature("No webhook secret is configured".into()));
        }
        let signature = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthError::InvalidSignature(format!("Missing {} header", self.header)))?;
        if signature.trim() == calculate_hmac(secret, body) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature("The body does not match its signature".into()))
        }
    }
}

pub struct HmacMiddlewareFactory {
    check: Option<Arc<SignatureCheck>>,
}

impl HmacMiddlewareFactory {
    /// Checks the body against `hmac_header` using `key`. When `enabled` is false, calls pass through unchecked.
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        let check = enabled.then(|| Arc::new(SignatureCheck { header: hmac_header.to_string(), secret: key }));
        if check.is_none() {
            warn!("🔐️ Signature checks on {hmac_header} are disabled");
        }
        Self { check }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService { check: self.check.clone(), service: Rc::new(service) }))
    }
}

pub struct HmacMiddlewareService<S> {
    check: Option<Arc<SignatureCheck>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let Some(check) = self.check.clone() else {
            trace!("🔐️ Passing {} through without a signature check", req.path());
            return Box::pin(service.call(req));
        };
        Box::pin(async move {
            let body =
                req.extract::<web::Bytes>().await.map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
            if let Err(e) = check.verify(req.headers(), &body) {
                warn!("🔐️ Rejecting webhook call to {}. {e}", req.path());
                return Err(ServerError::from(e).into());
            }
            trace!("🔐️ Signature on {} ✅️", req.path());
            req.set_payload(bytes_to_payload(body));
            service.call(req).await
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}

#[cfg(test)]
mod test {
    use actix_web::http::header::{HeaderName, HeaderValue};

    use super::*;

    const BODY: &[u8] = br#"{"id":632910392}"#;

    fn check(secret: &str) -> SignatureCheck {
        SignatureCheck { header: "X-Shopify-Hmac-SHA256".into(), secret: Secret::new(secret.to_string()) }
    }

    fn signed(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-shopify-hmac-sha256"), HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn matching_signatures_pass() {
        let headers = signed(&calculate_hmac("app-secret", BODY));
        assert!(check("app-secret").verify(&headers, BODY).is_ok());
    }

    #[test]
    fn bad_or_missing_signatures_fail() {
        let headers = signed(&calculate_hmac("someone-else", BODY));
        let err = check("app-secret").verify(&headers, BODY).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(m) if m.contains("does not match")));
        let err = check("app-secret").verify(&HeaderMap::new(), BODY).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(m) if m.contains("Missing")));
        let tampered = signed(&calculate_hmac("app-secret", b"{}"));
        assert!(check("app-secret").verify(&tampered, BODY).is_err());
    }

    #[test]
    fn an_empty_secret_rejects_everything() {
        let headers = signed(&calculate_hmac("", BODY));
        let err = check("").verify(&headers, BODY).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(m) if m.contains("No webhook secret")));
    }
}
