//! Audit trail middleware: records every mutating request's outcome
//! without altering the response.
//!
//! GET is never logged. The entry is queued after the response body has
//! been produced, and a failing audit write can never fail the request.

use axum::{
    body::Body,
    extract::{RawPathParams, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use uuid::Uuid;

use crate::models::NewAuditLog;
use crate::services::{AuditRecorder, SessionClaims};

/// Where an entity attribute lives for a given route.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef {
    /// A named path parameter, e.g. `:id`.
    PathParam(&'static str),
    /// A named field of the JSON response body.
    ResponseField(&'static str),
}

/// Per-route audit configuration, attached via `Extension` when the
/// route is registered. Declares which response parts map to the
/// audited entity instead of guessing from body shape.
#[derive(Debug, Clone, Copy)]
pub struct AuditDescriptor {
    pub entity_type: &'static str,
    pub id: Option<FieldRef>,
    pub identifier: Option<FieldRef>,
}

impl AuditDescriptor {
    /// Entity created by the request; id and identifier are read from
    /// the response body.
    pub const fn from_body(entity_type: &'static str, identifier_field: &'static str) -> Self {
        Self {
            entity_type,
            id: Some(FieldRef::ResponseField("id")),
            identifier: Some(FieldRef::ResponseField(identifier_field)),
        }
    }

    /// Entity with no addressable id (e.g. ephemeral artifacts).
    pub const fn named(entity_type: &'static str) -> Self {
        Self {
            entity_type,
            id: None,
            identifier: None,
        }
    }

    /// Entity addressed by a path parameter.
    pub const fn from_path(entity_type: &'static str, id_param: &'static str) -> Self {
        Self {
            entity_type,
            id: Some(FieldRef::PathParam(id_param)),
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, field: FieldRef) -> Self {
        self.identifier = Some(field);
        self
    }
}

/// Response-extension marker set by handlers that already wrote their
/// own audit entry; suppresses the middleware's record.
#[derive(Debug, Clone, Copy)]
pub struct AuditHandled;

/// State for the audit trail middleware.
#[derive(Clone)]
pub struct AuditTrail {
    pub recorder: AuditRecorder,
}

impl AuditTrail {
    pub fn new(recorder: AuditRecorder) -> Self {
        Self { recorder }
    }
}

pub async fn audit_trail(
    State(trail): State<AuditTrail>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    let Some(action) = action_for_method(req.method()) else {
        return next.run(req).await;
    };

    let descriptor = req.extensions().get::<AuditDescriptor>().copied();
    let actor_id = req.extensions().get::<SessionClaims>().map(|c| c.sub);

    // Path parameters must be captured before the request is consumed
    let param_for = |field: Option<FieldRef>| -> Option<String> {
        match field {
            Some(FieldRef::PathParam(name)) => params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string()),
            _ => None,
        }
    };
    let id_from_path = param_for(descriptor.and_then(|d| d.id));
    let identifier_from_path = param_for(descriptor.and_then(|d| d.identifier));

    let response = next.run(req).await;

    if response.extensions().get::<AuditHandled>().is_some() {
        return response;
    }

    let status = response.status();
    let success = status.as_u16() >= 200 && status.as_u16() < 400;

    // Buffer the body so descriptor fields and error messages can be
    // read; the identical bytes are handed back to the client.
    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body for audit");
            return Response::from_parts(parts, Body::empty());
        }
    };
    let json: Option<serde_json::Value> = serde_json::from_slice(&bytes).ok();

    let entity_id = id_from_path
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .or_else(|| match descriptor.and_then(|d| d.id) {
            Some(FieldRef::ResponseField(name)) => {
                json_field(&json, name).and_then(|s| Uuid::parse_str(&s).ok())
            }
            _ => None,
        });

    let entity_identifier = identifier_from_path.or_else(|| match descriptor
        .and_then(|d| d.identifier)
    {
        Some(FieldRef::ResponseField(name)) => json_field(&json, name),
        _ => None,
    });

    let error_message = if success {
        None
    } else {
        json.as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    let entity_type = descriptor.map(|d| d.entity_type).unwrap_or("unknown");

    trail.recorder.submit(NewAuditLog::mutation(
        actor_id,
        action,
        entity_type,
        entity_type,
        entity_id,
        entity_identifier,
        success,
        error_message,
        status.as_u16() as i32,
    ));

    Response::from_parts(parts, Body::from(bytes))
}

/// Map an HTTP method to the audited action. GET (and other read
/// methods) map to none: reads are deliberately not logged.
fn action_for_method(method: &Method) -> Option<&'static str> {
    match *method {
        Method::POST => Some("create"),
        Method::PUT | Method::PATCH => Some("update"),
        Method::DELETE => Some("delete"),
        _ => None,
    }
}

fn json_field(json: &Option<serde_json::Value>, name: &str) -> Option<String> {
    let value = json.as_ref()?.get(name)?;
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mutating_methods_map_to_actions() {
        assert_eq!(action_for_method(&Method::POST), Some("create"));
        assert_eq!(action_for_method(&Method::PUT), Some("update"));
        assert_eq!(action_for_method(&Method::PATCH), Some("update"));
        assert_eq!(action_for_method(&Method::DELETE), Some("delete"));
        assert_eq!(action_for_method(&Method::GET), None);
        assert_eq!(action_for_method(&Method::HEAD), None);
    }

    #[test]
    fn json_field_reads_strings_and_numbers() {
        let json = Some(serde_json::json!({
            "id": "0f2e7a2e-6f5e-4f7e-9b70-2f4c3a6d8e11",
            "revision": 3,
            "nested": {"ignored": true}
        }));

        assert_eq!(
            json_field(&json, "id").as_deref(),
            Some("0f2e7a2e-6f5e-4f7e-9b70-2f4c3a6d8e11")
        );
        assert_eq!(json_field(&json, "revision").as_deref(), Some("3"));
        assert_eq!(json_field(&json, "nested"), None);
        assert_eq!(json_field(&json, "missing"), None);
        assert_eq!(json_field(&None, "id"), None);
    }
}
