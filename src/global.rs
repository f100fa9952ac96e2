//! Document-wide finishing pass.
//!
//! Runs once after all fragments are merged: injects the shared pretty-print
//! parameter, configured request headers and response headers, and the
//! shared error responses. Everything here is additive and idempotent;
//! nothing an operation already declares is overwritten.

use crate::annotation::Config;
use crate::casing::pascal;
use crate::document::{Document, Parameter, RefOr, Response, Schema};

/// Shared component name of the pretty-print parameter.
pub const PRETTY_PARAM: &str = "PrettyResponse";

/// Apply the global pass to a merged document.
pub fn apply(doc: &mut Document, config: &Config) {
    inject_parameters(doc, config);
    inject_response_headers(doc, config);
    inject_error_responses(doc, config);
}

fn inject_parameters(doc: &mut Document, config: &Config) {
    doc.components
        .parameters
        .entry(PRETTY_PARAM.to_string())
        .or_insert_with(|| {
            RefOr::Item(
                Parameter::query("pretty", RefOr::Item(Schema::new("boolean")))
                    .describe("Pretty-print the response body"),
            )
        });

    let mut refs = vec![RefOr::parameter_ref(PRETTY_PARAM)];
    for (name, parameter) in &config.request_headers {
        doc.components
            .parameters
            .insert(name.clone(), RefOr::Item(parameter.clone()));
        refs.push(RefOr::parameter_ref(name));
    }

    for item in doc.paths.values_mut() {
        for reference in &refs {
            if !item.parameters.contains(reference) {
                item.parameters.push(reference.clone());
            }
        }
    }
}

fn inject_response_headers(doc: &mut Document, config: &Config) {
    if config.response_headers.is_empty() {
        return;
    }
    for (name, header) in &config.response_headers {
        doc.components.headers.insert(name.clone(), header.clone());
    }

    let inject = |response: &mut RefOr<Response>, config: &Config| {
        // referenced responses already carry their headers
        let Some(response) = response.as_item_mut() else {
            return;
        };
        for name in config.response_headers.keys() {
            response
                .headers
                .entry(name.clone())
                .or_insert_with(|| RefOr::header_ref(name));
        }
    };

    for item in doc.paths.values_mut() {
        for (_, operation) in item.operations_mut() {
            for response in operation.responses.values_mut() {
                inject(response, config);
            }
        }
    }
    for response in doc.components.responses.values_mut() {
        inject(response, config);
    }
}

fn inject_error_responses(doc: &mut Document, config: &Config) {
    for status in &config.error_responses {
        let name = error_component(*status);
        let mut schema = Schema::object();
        schema.properties.insert(
            "code".to_string(),
            RefOr::Item(Schema::new("integer")),
        );
        schema.properties.insert(
            "status".to_string(),
            RefOr::Item(Schema::new("string")),
        );
        schema.required = vec!["code".to_string(), "status".to_string()];
        doc.components
            .schemas
            .insert(name.clone(), RefOr::Item(schema));
        doc.components.responses.insert(
            name.clone(),
            RefOr::Item(Response::json(status_text(*status), RefOr::schema_ref(&name))),
        );
    }

    for item in doc.paths.values_mut() {
        for (method, operation) in item.operations_mut() {
            let mutating = matches!(method, "post" | "put" | "patch" | "delete");
            let listing = operation
                .operation_id
                .as_deref()
                .is_some_and(|id| id.starts_with("list"));
            for status in &config.error_responses {
                // a 404 on a listing is an empty page, a 409 needs a write
                if *status == 404 && listing && !config.list_not_found {
                    continue;
                }
                if *status == 409 && !mutating {
                    continue;
                }
                operation
                    .responses
                    .entry(status.to_string())
                    .or_insert_with(|| RefOr::response_ref(&error_component(*status)));
            }
        }
    }
}

/// `404` -> `ErrorNotFound`.
pub fn error_component(status: u16) -> String {
    format!("Error{}", pascal(status_text(status)))
}

/// The RFC 9110 reason phrase for a status code.
pub fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
