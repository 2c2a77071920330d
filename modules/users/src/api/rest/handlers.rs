use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::api::rest::dto::{CreateUserReq, MessageDto, UpdateUserReq, UserDto, UserListDto};
use crate::api::rest::error::{
    map_domain_error, not_json, route_not_found, user_not_found, ErrorResponse,
};
use crate::contract::model::NewUser;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

type JsonPayload = Result<Json<Value>, JsonRejection>;

/// List all users
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<UserListDto>, ErrorResponse> {
    info!("Listing users");

    match svc.list_users().await {
        Ok(users) => Ok(Json(UserListDto::from(users))),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e))
        }
    }
}

/// Create a new user
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    payload: JsonPayload,
) -> Result<(StatusCode, Json<UserDto>), ErrorResponse> {
    let mut body = json_object(payload)?;
    // Falsy values count as absent: 0, false, [], {}
    for key in ["username", "email"] {
        if body.get(key).is_some_and(is_falsy) {
            body.insert(key.to_string(), Value::Null);
        }
    }
    let req: CreateUserReq = bind(body)?;
    info!(username = ?req.username, "Creating user");

    let result = match NewUser::try_from(req) {
        Ok(new_user) => svc.create_user(new_user).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            warn!("Failed to create user: {}", e);
            Err(map_domain_error(&e))
        }
    }
}

/// Delete every user
pub async fn delete_all_users(
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<MessageDto>, ErrorResponse> {
    info!("Deleting all users");

    match svc.delete_all_users().await {
        Ok(_) => Ok(Json(MessageDto::new("All users have been deleted"))),
        Err(e) => {
            warn!("Failed to delete all users: {}", e);
            Err(map_domain_error(&e))
        }
    }
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserDto>, ErrorResponse> {
    let id = parse_id(&raw_id)?;
    info!("Getting user with id: {}", id);

    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            warn!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e))
        }
    }
}

/// Update an existing user
pub async fn update_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    payload: JsonPayload,
) -> Result<Json<UserDto>, ErrorResponse> {
    let id = parse_id(&raw_id)?;

    // The user must exist before the body is looked at
    let current = svc.get_user(id).await.map_err(|e| {
        warn!("Failed to update user {}: {}", id, e);
        map_domain_error(&e)
    })?;

    let req: UpdateUserReq = bind(json_object(payload)?)?;
    info!("Updating user {}", id);
    debug!(username = ?req.username, email_changed = req.email.is_some(), "Update fields");

    match svc.update_loaded(current, req.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            warn!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e))
        }
    }
}

/// Delete a user by ID
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageDto>, ErrorResponse> {
    let id = parse_id(&raw_id)?;
    info!("Deleting user: {}", id);

    match svc.delete_user(id).await {
        Ok(()) => Ok(Json(MessageDto::new(format!("User {id} deleted")))),
        Err(e) => {
            warn!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e))
        }
    }
}

/// Only plain decimal digits address a user; anything else is not a route.
/// Digit strings too large for an id name no stored user.
pub(crate) fn parse_id(raw: &str) -> Result<i64, ErrorResponse> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(route_not_found());
    }
    raw.parse().map_err(|_| {
        warn!("User id out of range: {}", raw);
        user_not_found()
    })
}

/// Accept only a non-empty JSON object.
fn json_object(payload: JsonPayload) -> Result<Map<String, Value>, ErrorResponse> {
    match payload {
        Ok(Json(Value::Object(map))) if !map.is_empty() => Ok(map),
        Ok(_) => Err(not_json()),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection);
            Err(not_json())
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Bind a JSON object to the request DTO.
fn bind<T: DeserializeOwned>(body: Map<String, Value>) -> Result<T, ErrorResponse> {
    serde_json::from_value(Value::Object(body)).map_err(|e| {
        let e = DomainError::invalid_field("username or email", e.to_string());
        warn!("{}", e);
        map_domain_error(&e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_id_accepts_only_decimal_digits() {
        assert_eq!(parse_id("1"), Ok(1));
        assert_eq!(parse_id("0042"), Ok(42));
        assert_eq!(parse_id("99999999999"), Ok(99_999_999_999));
        for raw in ["", "-1", "+1", "abc", "1.5"] {
            assert_eq!(parse_id(raw), Err(route_not_found()), "{raw}");
        }
    }

    #[test]
    fn parse_id_beyond_i64_is_an_unknown_user() {
        let err = parse_id("99999999999999999999999").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body(), json!({"message": "User not found"}));
    }

    #[test]
    fn json_object_rejects_non_objects_and_empty_objects() {
        for value in [json!({}), json!([]), json!("x"), json!(null), json!(3)] {
            let err = json_object(Ok(Json(value))).unwrap_err();
            assert_eq!(err, not_json());
        }
    }

    #[test]
    fn empty_and_zero_values_are_falsy() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(is_falsy(&value), "{value}");
        }
        for value in [json!(true), json!(1), json!("a"), json!([0]), json!({"a": 1})] {
            assert!(!is_falsy(&value), "{value}");
        }
    }

    #[test]
    fn bind_reports_mistyped_fields() {
        let body = json!({"username": ["x"]}).as_object().cloned().unwrap();
        let err = bind::<UpdateUserReq>(body).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({"error": "Invalid username or email"}));
    }
}
