//! API-key middleware for Actix Web.
//!
//! Wrap the admin scope with this middleware to require a shared key on every request. The key is supplied in the
//! `x-pcs-admin-key` header and compared in constant time against the configured value.
//!
//! There is deliberately no "disabled" mode: a server without a configured key generates a random one at startup,
//! so the admin surface is never open.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use pcs_common::Secret;

use crate::helpers::constant_time_eq;

pub const ADMIN_KEY_HEADER: &str = "x-pcs-admin-key";

pub struct ApiKeyMiddlewareFactory {
    key: Secret<String>,
}

impl ApiKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        ApiKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ApiKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct ApiKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
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
        let expected = self.key.reveal().clone();
        Box::pin(async move {
            trace!("🔐️ Checking admin API key for request");
            let supplied = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No admin API key found in request. Denying access.");
                ErrorForbidden("No admin API key supplied.")
            })?;
            if !expected.is_empty() && constant_time_eq(supplied.as_bytes(), expected.as_bytes()) {
                trace!("🔐️ Admin API key check ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin API key in request. Denying access.");
                Err(ErrorForbidden("Invalid admin API key."))
            }
        })
    }
}
