//! HTTP surface: property CRUD for feeds and users, plus mirror
//! registration endpoints. Every response uses the `{code, status, data}`
//! envelope except 401, which carries no body.
use crate::auth::{self, Principal};
use crate::errors::EsdrError;
use crate::filter::PropertyFilter;
use crate::guard::{self, OwnerAccess};
use crate::settings::Settings;
use crate::storage::{self, MirrorCreate, Owner};
use crate::validate::{self, Violation};
use crate::values;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
}

/// Handler-level error taxonomy, mapped onto status codes and the response
/// envelope by its IntoResponse impl.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation(Vec<Violation>),
    Duplicate {
        realm: String,
        user_id: i64,
        product_id: i64,
    },
    Internal(EsdrError),
}

impl From<EsdrError> for ApiError {
    fn from(err: EsdrError) -> Self {
        ApiError::Internal(err)
    }
}

fn envelope(code: StatusCode, status: &str, data: Value) -> Response {
    (
        code,
        Json(json!({
            "code": code.as_u16(),
            "status": status,
            "data": data,
        })),
    )
        .into_response()
}

fn success(code: StatusCode, data: Value) -> Response {
    envelope(code, "success", data)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Missing or invalid credential: status only, no body
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden => envelope(StatusCode::FORBIDDEN, "error", Value::Null),
            ApiError::NotFound => envelope(StatusCode::NOT_FOUND, "error", Value::Null),
            ApiError::Validation(violations) => envelope(
                StatusCode::UNPROCESSABLE_ENTITY,
                "error",
                json!(violations),
            ),
            ApiError::Duplicate {
                realm,
                user_id,
                product_id,
            } => envelope(
                StatusCode::CONFLICT,
                "error",
                json!({
                    "realm": realm,
                    "userId": user_id,
                    "productId": product_id,
                }),
            ),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                envelope(StatusCode::INTERNAL_SERVER_ERROR, "error", Value::Null)
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/feeds/{feed_id}/properties",
            get(list_feed_properties).delete(delete_feed_properties),
        )
        .route(
            "/feeds/{feed_id}/properties/{key}",
            put(set_feed_property)
                .get(get_feed_property)
                .delete(delete_feed_property),
        )
        .route(
            "/users/{user_id}/properties",
            get(list_user_properties).delete(delete_user_properties),
        )
        .route(
            "/users/{user_id}/properties/{key}",
            put(set_user_property)
                .get(get_user_property)
                .delete(delete_user_property),
        )
        .route(
            "/mirrors/{realm}/registrations/products/{product}",
            post(create_mirror_registration),
        )
        .route(
            "/mirrors/{realm}/registrations/{mirror_token}",
            delete(delete_mirror_registration),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, db: DatabaseConnection) -> miette::Result<()> {
    let state = AppState {
        settings: Arc::new(settings),
        db,
    };

    let addr: SocketAddr = state
        .settings
        .bind_addr()
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let router = router(state);

    tracing::info!(%addr, "API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}

/// Authenticates the caller and checks owner-level access. Runs before any
/// validation or store call.
async fn authorize_owner(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
) -> Result<Principal, ApiError> {
    let principal = auth::resolve_bearer(&state.db, headers)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    match guard::check_owner(&state.db, principal, owner).await? {
        OwnerAccess::Allowed => Ok(principal),
        OwnerAccess::Forbidden => Err(ApiError::Forbidden),
    }
}

fn stored_value_body(stored: &storage::StoredValue) -> Value {
    json!({
        "key": stored.key,
        "value": stored.value.as_json(),
    })
}

// Property handlers, shared between the feed and user routes.

async fn set_property_for(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
    key: &str,
    body: Value,
) -> Result<Response, ApiError> {
    let principal = authorize_owner(state, headers, owner).await?;

    // Key constraints first, then the payload, collecting every violation
    let mut violations = validate::check_key(key);
    let parsed = match values::parse_payload(&body) {
        Ok(v) => Some(v),
        Err(mut more) => {
            violations.append(&mut more);
            None
        }
    };
    let value = match parsed {
        Some(v) if violations.is_empty() => v,
        _ => return Err(ApiError::Validation(violations)),
    };

    let stored = storage::set_property(&state.db, owner, principal.client_id, key, &value).await?;
    Ok(success(StatusCode::OK, stored_value_body(&stored)))
}

async fn get_property_for(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
    key: &str,
) -> Result<Response, ApiError> {
    let principal = authorize_owner(state, headers, owner).await?;

    let violations = validate::check_key(key);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    match storage::get_property(&state.db, owner, principal.client_id, key).await? {
        Some(stored) => Ok(success(StatusCode::OK, stored_value_body(&stored))),
        None => Err(ApiError::NotFound),
    }
}

async fn list_properties_for(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
    query: &[(String, String)],
) -> Result<Response, ApiError> {
    let principal = authorize_owner(state, headers, owner).await?;

    let filter = PropertyFilter::from_query(query).map_err(ApiError::Validation)?;
    let rows = storage::get_properties(&state.db, owner, principal.client_id, &filter).await?;

    let mut mapping = serde_json::Map::new();
    for row in rows {
        mapping.insert(row.key, row.value.as_json());
    }
    Ok(success(StatusCode::OK, Value::Object(mapping)))
}

async fn delete_property_for(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
    key: &str,
) -> Result<Response, ApiError> {
    let principal = authorize_owner(state, headers, owner).await?;

    let violations = validate::check_key(key);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    let deleted = storage::delete_property(&state.db, owner, principal.client_id, key).await?;
    Ok(success(
        StatusCode::OK,
        json!({ "propertiesDeleted": deleted }),
    ))
}

async fn delete_properties_for(
    state: &AppState,
    headers: &HeaderMap,
    owner: Owner,
) -> Result<Response, ApiError> {
    let principal = authorize_owner(state, headers, owner).await?;

    let deleted = storage::delete_properties(&state.db, owner, principal.client_id).await?;
    Ok(success(
        StatusCode::OK,
        json!({ "propertiesDeleted": deleted }),
    ))
}

// Feed property routes

async fn set_feed_property(
    State(state): State<AppState>,
    Path((feed_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    set_property_for(&state, &headers, Owner::feed(feed_id), &key, body).await
}

async fn get_feed_property(
    State(state): State<AppState>,
    Path((feed_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    get_property_for(&state, &headers, Owner::feed(feed_id), &key).await
}

async fn list_feed_properties(
    State(state): State<AppState>,
    Path(feed_id): Path<i64>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    list_properties_for(&state, &headers, Owner::feed(feed_id), &query).await
}

async fn delete_feed_property(
    State(state): State<AppState>,
    Path((feed_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    delete_property_for(&state, &headers, Owner::feed(feed_id), &key).await
}

async fn delete_feed_properties(
    State(state): State<AppState>,
    Path(feed_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    delete_properties_for(&state, &headers, Owner::feed(feed_id)).await
}

// User property routes

async fn set_user_property(
    State(state): State<AppState>,
    Path((user_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    set_property_for(&state, &headers, Owner::user(user_id), &key, body).await
}

async fn get_user_property(
    State(state): State<AppState>,
    Path((user_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    get_property_for(&state, &headers, Owner::user(user_id), &key).await
}

async fn list_user_properties(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    list_properties_for(&state, &headers, Owner::user(user_id), &query).await
}

async fn delete_user_property(
    State(state): State<AppState>,
    Path((user_id, key)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    delete_property_for(&state, &headers, Owner::user(user_id), &key).await
}

async fn delete_user_properties(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    delete_properties_for(&state, &headers, Owner::user(user_id)).await
}

// Mirror registration routes

async fn create_mirror_registration(
    State(state): State<AppState>,
    Path((realm, product)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    // Bearer token or HTTP Basic; registration is per user, not per client
    let user_id = auth::resolve_user(&state.db, &headers)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let violations = validate::check_realm(&realm);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    let product = storage::resolve_product(&state.db, &product)
        .await?
        .ok_or(ApiError::NotFound)?;

    match storage::create_mirror_registration(&state.db, &realm, user_id, product.id).await? {
        MirrorCreate::Created(registration) => Ok(success(
            StatusCode::CREATED,
            json!({
                "realm": registration.realm,
                "userId": registration.user_id,
                "productId": registration.product_id,
                "mirrorToken": registration.mirror_token,
            }),
        )),
        MirrorCreate::Duplicate => Err(ApiError::Duplicate {
            realm,
            user_id,
            product_id: product.id,
        }),
    }
}

async fn delete_mirror_registration(
    State(state): State<AppState>,
    Path((realm, mirror_token)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    // No credential: the token itself is the authority
    let mut violations = validate::check_realm(&realm);
    violations.extend(validate::check_mirror_token(&mirror_token));
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    let deleted = storage::delete_mirror_registration(&state.db, &realm, &mirror_token).await?;
    Ok(success(
        StatusCode::OK,
        json!({ "registrationsDeleted": deleted }),
    ))
}
