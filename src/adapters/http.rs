use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            context::{ActorContext, RequestContext},
            error::AuditError,
            event::SearchQuery,
            id::{ActorId, AuditLogId},
        },
        services::audit_service::CreateResult,
    },
    axum::{
        Json, Router,
        extract::{ConnectInfo, FromRequestParts, Path, Query, State},
        http::{HeaderMap, StatusCode, request::Parts},
        response::{IntoResponse, Response},
        routing::get,
    },
    std::net::{IpAddr, SocketAddr},
};

const USER_HEADER: &str = "x-user-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/audit-logs", get(search_handler).post(create_handler))
        .route("/api/audit-logs/{id}", get(read_handler))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

/// Build the actor context from the headers an upstream gateway sets,
/// falling back to the socket peer for the client address. The system
/// identity can never be claimed over HTTP.
pub fn actor_from_headers(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
) -> Result<ActorContext, AuditError> {
    let raw_id =
        header(headers, USER_HEADER).ok_or_else(|| AuditError::ActorNotFound("<anonymous>".into()))?;
    let actor_id = ActorId::new(raw_id)?;
    if actor_id.is_system() {
        return Err(AuditError::ActorNotFound(actor_id.into_inner()));
    }

    let remote_ip = header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').map(str::trim).find(|hop| !hop.is_empty()))
        .or_else(|| header(headers, "x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()));

    let request = RequestContext {
        remote_ip,
        session: cookie(headers, "SESSION").or_else(|| cookie(headers, "session")),
        request_id: header(headers, REQUEST_ID_HEADER).map(str::to_string),
    };
    Ok(ActorContext::new(actor_id).with_request(request))
}

/// The calling actor. The peer address is only present when the server
/// was started with connect info.
pub struct Actor(pub ActorContext);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self(actor_from_headers(&parts.headers, peer)?))
    }
}

pub async fn create_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let response = match state.service.create(&actor, payload).await? {
        CreateResult::Indexed(view) => (StatusCode::CREATED, Json(view)).into_response(),
        CreateResult::IndexDeferred(view) => {
            tracing::info!(audit_id = %view.id, "created, index write deferred");
            (StatusCode::CREATED, Json(view)).into_response()
        }
        CreateResult::Disabled => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"status": "disabled"})),
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn read_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: AuditLogId = id.parse()?;
    let view = state.service.read(&actor, id).await?;
    Ok(Json(view).into_response())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let page = state.service.search(&actor, query).await?;
    Ok(Json(page).into_response())
}
