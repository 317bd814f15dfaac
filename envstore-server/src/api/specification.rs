//! Specification submission
//!
//! The body is checked shape-first and every problem is reported at once as a
//! list of field violations:
//!
//! ```json
//! {
//!   "status": "error",
//!   "error": [{"loc": ["dependencies", 1], "msg": "...", "type": "type_error.dependency"}]
//! }
//! ```

use std::sync::LazyLock;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use regex::Regex;
use serde_json::{Map, Value};

use super::envelope::Ack;
use crate::auth::{Authorizer, Permission, PermissionSet, RoleBindingAuthorizer};
use crate::error::{Error, FieldViolation, Location, Result};
use crate::state::AppState;
use crate::store::{Dependency, SpecificationDocument};

/// Allowed characters of environment and namespace names
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("name regex is valid"));

fn key(field: &str) -> Location {
    Location::Key(field.to_string())
}

fn check_name(
    object: &Map<String, Value>,
    field: &str,
    required: bool,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) if required => {
            violations.push(FieldViolation::missing(field));
            None
        }
        None | Some(Value::Null) => None,
        Some(Value::String(name)) if NAME_REGEX.is_match(name) => Some(name.clone()),
        Some(Value::String(_)) => {
            violations.push(FieldViolation::new(
                vec![key(field)],
                "value_error.str.regex",
                format!("string does not match regex \"{}\"", NAME_REGEX.as_str()),
            ));
            None
        }
        Some(_) => {
            violations.push(FieldViolation::new(
                vec![key(field)],
                "type_error.str",
                "str type expected",
            ));
            None
        }
    }
}

fn check_list<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> &'a [Value] {
    match object.get(field) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            violations.push(FieldViolation::new(
                vec![key(field)],
                "type_error.list",
                "value is not a valid list",
            ));
            &[]
        }
    }
}

fn check_dependency(
    index: usize,
    value: &Value,
    violations: &mut Vec<FieldViolation>,
) -> Option<Dependency> {
    let loc = vec![key("dependencies"), Location::Index(index)];
    match value {
        Value::String(spec) => Some(Dependency::Conda(spec.clone())),
        Value::Object(entry) => match entry.get("pip") {
            Some(Value::Array(packages)) => {
                let mut pip = Vec::with_capacity(packages.len());
                for (i, package) in packages.iter().enumerate() {
                    match package {
                        Value::String(name) => pip.push(name.clone()),
                        _ => {
                            let mut loc = loc.clone();
                            loc.extend([key("pip"), Location::Index(i)]);
                            violations.push(FieldViolation::new(
                                loc,
                                "type_error.str",
                                "str type expected",
                            ));
                        }
                    }
                }
                Some(Dependency::Pip { pip })
            }
            _ => {
                violations.push(FieldViolation::new(
                    loc,
                    "type_error.dependency",
                    "expected a match spec string or {\"pip\": [...]}",
                ));
                None
            }
        },
        _ => {
            violations.push(FieldViolation::new(
                loc,
                "type_error.dependency",
                "expected a match spec string or {\"pip\": [...]}",
            ));
            None
        }
    }
}

/// Validate a specification body
///
/// Returns every violation found, not just the first.
pub fn validate_specification(
    body: &Value,
) -> std::result::Result<SpecificationDocument, Vec<FieldViolation>> {
    let Some(object) = body.as_object() else {
        return Err(vec![FieldViolation::new(
            vec![key("__root__")],
            "type_error.dict",
            "value is not a valid dict",
        )]);
    };

    let mut violations = Vec::new();

    let name = check_name(object, "name", true, &mut violations);
    let namespace = check_name(object, "namespace", false, &mut violations);

    let mut channels = Vec::new();
    for (i, channel) in check_list(object, "channels", &mut violations).iter().enumerate() {
        match channel {
            Value::String(channel) => channels.push(channel.clone()),
            _ => violations.push(FieldViolation::new(
                vec![key("channels"), Location::Index(i)],
                "type_error.str",
                "str type expected",
            )),
        }
    }

    let dependencies: Vec<Dependency> = check_list(object, "dependencies", &mut violations)
        .iter()
        .enumerate()
        .filter_map(|(i, value)| check_dependency(i, value, &mut violations))
        .collect();

    match name {
        Some(name) if violations.is_empty() => Ok(SpecificationDocument {
            name,
            channels,
            dependencies,
            namespace,
        }),
        _ => Err(violations),
    }
}

/// `POST /api/v1/specification/`
pub async fn post_specification(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Ack> {
    let Json(body) = body.map_err(|e| Error::BadRequest(e.body_text()))?;
    let document = validate_specification(&body).map_err(Error::Validation)?;

    let namespace = document
        .namespace
        .clone()
        .unwrap_or_else(|| state.config().namespace.default_namespace.clone());

    authz.authorize_request(
        &format!("{namespace}/{}", document.name),
        &PermissionSet::from([Permission::EnvironmentCreate]),
        true,
    )?;

    let build = state.store().register_specification(&namespace, document)?;
    tracing::info!(
        namespace = %namespace,
        environment = %build.environment,
        build_id = build.id,
        "Specification submitted"
    );
    Ok(Ack::ok())
}
