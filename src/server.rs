//! HTTP transport: a thin axum surface over the room service. Identity is a
//! `player_id` cookie minted on first contact; live state goes out as a
//! server-sent event stream of per-seat views.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::room::{Action, Player, Room, RoomError, RoomService};

const PLAYER_ID_COOKIE: &str = "player_id";
const COOKIE_MAX_AGE: u32 = 2_592_000; // 30 days

/// The caller's opaque identity, attached by the session middleware.
#[derive(Debug, Clone)]
pub struct PlayerId(pub String);

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_owned(),
        }
    }
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        let status = match &err {
            RoomError::NotFound => StatusCode::NOT_FOUND,
            RoomError::Internal(cause) => {
                error!(error = %cause, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub fn router(service: Arc<RoomService>) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/:id/players", post(join_room).delete(leave_room))
        .route("/rooms/:id/live", get(live))
        .route("/rooms/:id/actions", post(actions))
        .route("/rooms/:id/bots", post(add_bot))
        .layer(middleware::from_fn(session))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn player_id_from_cookies(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == PLAYER_ID_COOKIE && !value.is_empty()).then(|| value.to_owned())
    })
}

/// Ensures every request carries a player ID, minting a fresh one into a
/// cookie when the caller has none yet.
async fn session(mut req: Request, next: Next) -> Response {
    let (player_id, minted) = match player_id_from_cookies(req.headers()) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    req.extensions_mut().insert(PlayerId(player_id.clone()));
    let mut res = next.run(req).await;
    if minted {
        let cookie = format!(
            "{PLAYER_ID_COOKIE}={player_id}; Path=/; Max-Age={COOKIE_MAX_AGE}; SameSite=Strict",
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    res
}

#[derive(Debug, Deserialize)]
struct NameForm {
    name: String,
}

fn validated_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return Err(AppError::bad_request("name is invalid"));
    }
    Ok(name.to_owned())
}

async fn create_room(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Form(form): Form<NameForm>,
) -> Result<impl IntoResponse, AppError> {
    let name = validated_name(&form.name)?;
    let room = service.create(Player {
        id: player_id,
        name,
        is_bot: false,
    })?;
    let id = room.lock().id.clone();
    Ok((StatusCode::CREATED, id))
}

async fn join_room(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Path(id): Path<String>,
    Form(form): Form<NameForm>,
) -> Result<StatusCode, AppError> {
    let name = validated_name(&form.name)?;
    let room = service.get(&id)?;
    service.add_player(
        &room,
        Player {
            id: player_id,
            name,
            is_bot: false,
        },
    )?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_room(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let room = service.get(&id)?;
    service.remove_player(&room, &player_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Removes the subscription when the client's stream is dropped.
struct ClientGuard {
    room: Arc<Mutex<Room>>,
    token: u64,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.room.lock().remove_client(self.token);
    }
}

async fn live(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let room = service.get(&id)?;
    let (tx, rx) = mpsc::unbounded_channel();
    let token = room.lock().add_client(player_id, tx);
    let guard = ClientGuard { room, token };

    let stream = UnboundedReceiverStream::new(rx).map(move |view| {
        let _keep_alive = &guard;
        Event::default().json_data(&view)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn actions(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Path(id): Path<String>,
    Json(action): Json<Action>,
) -> Result<StatusCode, AppError> {
    let room = service.get(&id)?;
    service.dispatch(&room, &player_id, action)?;
    Ok(StatusCode::OK)
}

async fn add_bot(
    State(service): State<Arc<RoomService>>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let room = service.get(&id)?;
    service.add_bot(&room, &player_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::room::MemoryRepository;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(RoomService::new(Arc::new(MemoryRepository::new()))))
    }

    fn form_request(method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    #[tokio::test]
    async fn create_room_mints_a_cookie_and_returns_the_id() {
        let app = app();
        let res = app
            .oneshot(form_request("POST", "/rooms", "name=Ann", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap()
            .to_owned();
        assert!(cookie.starts_with("player_id="));

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let id = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(id.len(), 4);
        assert!(id.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn join_leave_and_missing_rooms() {
        let app = app();
        let res = app
            .clone()
            .oneshot(form_request("POST", "/rooms", "name=Ann", None))
            .await
            .unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let id = String::from_utf8(body.to_vec()).unwrap();

        let res = app
            .clone()
            .oneshot(form_request(
                "POST",
                &format!("/rooms/{id}/players"),
                "name=Ben",
                Some("player_id=ben-id"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = app
            .clone()
            .oneshot(form_request(
                "POST",
                "/rooms/QQQQ/players",
                "name=Cid",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/rooms/{id}/players"))
                    .header(header::COOKIE, "player_id=ben-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let app = app();
        let res = app
            .clone()
            .oneshot(form_request("POST", "/rooms", "name=", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(form_request("POST", "/rooms", "name=a%3Db", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn actions_require_a_matching_nonce() {
        let app = app();
        let res = app
            .clone()
            .oneshot(form_request(
                "POST",
                "/rooms",
                "name=Ann",
                Some("player_id=ann-id"),
            ))
            .await
            .unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let id = String::from_utf8(body.to_vec()).unwrap();

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/rooms/{id}/actions"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, "player_id=ann-id")
                    .body(Body::from(r#"{"nonce":5,"type":"draw","tiles":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
