//! Per-request context.
//!
//! One `RequestContext` exists per inbound call: the resolved controller
//! and action, extracted path parameters, query arguments, JSON body and
//! the resolved identity. Never shared across requests.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::auth::Identity;

use super::ApiError;

/// The transport-level pieces of a request, before routing.
#[derive(Debug, Default)]
pub struct RequestParts {
    pub jwt: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
    pub client_ip: Option<IpAddr>,
}

#[derive(Debug)]
pub struct RequestContext {
    controller: String,
    action: String,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Value,
    jwt: Option<String>,
    client_ip: Option<IpAddr>,
    identity: Identity,
}

impl RequestContext {
    pub fn new(
        controller: impl Into<String>,
        action: impl Into<String>,
        params: HashMap<String, String>,
        parts: RequestParts,
    ) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
            params,
            query: parts.query,
            body: parts.body,
            jwt: parts.jwt,
            client_ip: parts.client_ip,
            identity: Identity::Anonymous,
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn jwt(&self) -> Option<&str> {
        self.jwt.as_deref()
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Set by the funnel once identity resolution succeeds.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// The current user's id, or `NotAuthenticated` for anonymous callers.
    pub fn user_id(&self) -> Result<i64, ApiError> {
        Ok(self.identity.require_user_id()?)
    }

    // Arguments: path parameters first, then query.

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }

    pub fn arg_str(&self, name: &str) -> Result<&str, ApiError> {
        self.arg(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing argument: {name}")))
    }

    pub fn arg_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.arg(name).unwrap_or(default)
    }

    pub fn arg_i64(&self, name: &str) -> Result<i64, ApiError> {
        self.arg_str(name)?
            .parse()
            .map_err(|_| ApiError::bad_request(format!("argument {name} must be an integer")))
    }

    // Body fields.

    pub fn opt_body_str(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    pub fn body_str(&self, name: &str) -> Result<&str, ApiError> {
        self.opt_body_str(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing body field: {name}")))
    }

    pub fn opt_body_i64(&self, name: &str) -> Option<i64> {
        self.body.get(name).and_then(Value::as_i64)
    }

    pub fn body_datetime(&self, name: &str) -> Result<DateTime<Utc>, ApiError> {
        parse_datetime(name, self.body_str(name)?)
    }

    pub fn opt_body_datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        match self.opt_body_str(name) {
            None => Ok(None),
            Some(raw) => parse_datetime(name, raw).map(Some),
        }
    }
}

fn parse_datetime(name: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|_| ApiError::bad_request(format!("body field {name} must be an RFC 3339 date")))
}
