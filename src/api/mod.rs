//! REST API for the host control surface
//!
//! Exposes the action, condition and variable definitions, runs actions,
//! and pushes display value and condition updates over a WebSocket.
//! Default port: 8126

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::drivers::{Driver, ExecutionContext};
use crate::projection::{ArtworkFetcher, Condition, DisplayValues};
use crate::state::MediaStore;
use crate::status::{ActivityDirection, ConnectionStatus};
use crate::surface::{self, ConditionKind, ACTIONS, CONDITIONS, VARIABLES};

/// Default API port
pub const DEFAULT_API_PORT: u16 = 8126;

/// Shared state for API handlers
pub struct ApiState {
    pub driver: Arc<dyn Driver>,
    pub ctx: ExecutionContext,
    pub store: MediaStore,
    pub artwork: ArtworkFetcher,
    /// Last display values pushed by the driver
    pub variables: Arc<RwLock<DisplayValues>>,
    /// Broadcast channel for projection updates
    pub update_tx: broadcast::Sender<ApiUpdate>,
}

/// Projection update notification (sent via WebSocket)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ApiUpdate {
    Variables(BTreeMap<&'static str, String>),
    Conditions(BTreeMap<&'static str, bool>),
}

impl ApiState {
    /// Build the API state and subscribe it to the driver's projection updates
    pub fn new(driver: Arc<dyn Driver>, store: MediaStore, ctx: ExecutionContext) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(64);
        let variables = Arc::new(RwLock::new(store.read(DisplayValues::from_state)));

        {
            let variables = Arc::clone(&variables);
            let tx = update_tx.clone();
            driver.subscribe_variables(Arc::new(move |values| {
                *variables.write() = values.clone();
                // Best-effort broadcast (ignore if no subscribers)
                let _ = tx.send(ApiUpdate::Variables(values.to_map()));
            }));
        }

        {
            let store = store.clone();
            let tx = update_tx.clone();
            driver.subscribe_condition_checks(Arc::new(move || {
                let _ = tx.send(ApiUpdate::Conditions(condition_values(&store)));
            }));
        }

        Arc::new(Self {
            driver,
            ctx,
            store,
            artwork: ArtworkFetcher::default(),
            variables,
            update_tx,
        })
    }

    fn snapshot(&self) -> [ApiUpdate; 2] {
        [
            ApiUpdate::Variables(self.variables.read().to_map()),
            ApiUpdate::Conditions(condition_values(&self.store)),
        ]
    }
}

/// Live evaluation of every boolean condition
pub fn condition_values(store: &MediaStore) -> BTreeMap<&'static str, bool> {
    store.read(|state| {
        Condition::ALL
            .into_iter()
            .map(|c| (c.id(), c.evaluate(state)))
            .collect()
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: ConnectionStatus,
    endpoint: String,
    connected: bool,
    /// Milliseconds since the last frame from the media app
    #[serde(skip_serializing_if = "Option::is_none")]
    last_inbound: Option<u64>,
    /// Milliseconds since the last command sent
    #[serde(skip_serializing_if = "Option::is_none")]
    last_outbound: Option<u64>,
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn not_found(error: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/actions", get(list_actions))
        .route("/api/actions/:id", post(run_action))
        .route("/api/variables", get(list_variables))
        .route("/api/conditions", get(list_conditions))
        .route("/api/conditions/:id", get(get_condition))
        .route("/api/ws", get(updates_ws))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// GET /api/status - Connection state and recent activity
async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let status = state.driver.connection_status();
    let endpoint = state.ctx.config.read().await.media.ws_url();
    let name = state.driver.name();

    let since = |direction| {
        state
            .ctx
            .activity_tracker
            .as_ref()
            .and_then(|tracker| tracker.since_last(name, direction))
            .map(|elapsed| elapsed.as_millis() as u64)
    };

    Json(StatusResponse {
        connected: status == ConnectionStatus::Connected,
        status,
        endpoint,
        last_inbound: since(ActivityDirection::Inbound),
        last_outbound: since(ActivityDirection::Outbound),
    })
}

/// GET /api/actions - List available actions
async fn list_actions() -> Json<Value> {
    Json(serde_json::json!(ACTIONS))
}

/// POST /api/actions/:id - Run an action
///
/// A command the media app rejected still answers 200 with its body;
/// only a request that could not complete is an error.
async fn run_action(
    Path(id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Value>, ApiError> {
    let action = surface::find_action(&id).ok_or_else(|| {
        ApiError::not_found(format!(
            "Unknown action: '{}'. Use GET /api/actions to see available actions.",
            id
        ))
    })?;

    match state.driver.execute(action.id, state.ctx.clone()).await {
        Ok(body) => {
            info!("Action executed: {}", action.name);
            Ok(Json(body))
        }
        Err(e) => Err(ApiError {
            status: StatusCode::BAD_GATEWAY,
            error: format!("{:#}", e),
        }),
    }
}

/// GET /api/variables - Variable definitions with current values
async fn list_variables(State(state): State<Arc<ApiState>>) -> Json<Value> {
    Json(serde_json::json!({
        "definitions": VARIABLES,
        "values": state.variables.read().to_map(),
    }))
}

/// GET /api/conditions - Condition definitions with live evaluations
async fn list_conditions(State(state): State<Arc<ApiState>>) -> Json<Value> {
    Json(serde_json::json!({
        "definitions": CONDITIONS,
        "values": condition_values(&state.store),
    }))
}

/// GET /api/conditions/:id - Evaluate one condition
async fn get_condition(
    Path(id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Value>, ApiError> {
    let def = surface::find_condition(&id).ok_or_else(|| {
        ApiError::not_found(format!(
            "Unknown condition: '{}'. Use GET /api/conditions to see available conditions.",
            id
        ))
    })?;

    let body = match def.kind {
        ConditionKind::Boolean { condition, .. } => serde_json::json!({
            "id": def.id,
            "value": condition.check(&state.store),
        }),
        ConditionKind::Advanced => {
            let image = state.artwork.fetch(&state.store).await;
            serde_json::json!(image)
        }
    };

    Ok(Json(body))
}

/// GET /api/ws - WebSocket for push notifications
async fn updates_ws(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn send_update(socket: &mut WebSocket, update: &ApiUpdate) -> bool {
    match serde_json::to_string(update) {
        Ok(msg) => socket.send(Message::Text(msg)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize update: {}", e);
            true
        }
    }
}

/// Handle WebSocket connection for projection updates
async fn handle_websocket(mut socket: WebSocket, state: Arc<ApiState>) {
    debug!("WebSocket client connected for updates");

    // Subscribe before the snapshot so no refresh falls in between
    let mut rx = state.update_tx.subscribe();
    for update in state.snapshot() {
        if !send_update(&mut socket, &update).await {
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        if !send_update(&mut socket, &update).await {
                            debug!("WebSocket client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged by {} messages", n);
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

/// Serve the API on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<ApiState>) -> Result<()> {
    axum::serve(listener, build_router(state))
        .await
        .context("API server error")?;

    Ok(())
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, bind: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind API server to {}:{}", bind, port))?;

    info!("🌐 Starting API server on http://{}", listener.local_addr()?);
    serve(listener, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, MediaConfig};
    use crate::drivers::MediaDriver;
    use crate::state::Track;
    use crate::status::ActivityTracker;
    use futures_util::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite;

    struct TestApi {
        base: String,
        addr: SocketAddr,
        driver: Arc<MediaDriver>,
        activity: Arc<ActivityTracker>,
    }

    async fn spawn_api(endpoint: MediaConfig) -> TestApi {
        let driver = Arc::new(MediaDriver::new(endpoint.clone()));
        let config = AppConfig {
            media: endpoint,
            ..AppConfig::default()
        };
        let activity = Arc::new(ActivityTracker::new());
        let ctx = ExecutionContext::new(config).with_activity_tracker(Arc::clone(&activity));
        let state = ApiState::new(driver.clone(), driver.store(), ctx);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));

        TestApi {
            base: format!("http://{}", addr),
            addr,
            driver,
            activity,
        }
    }

    fn endpoint_for(server: &mockito::ServerGuard) -> MediaConfig {
        let addr: SocketAddr = server.host_with_port().parse().unwrap();
        MediaConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    fn closed_endpoint() -> MediaConfig {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        MediaConfig {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn test_health_and_definitions() {
        let api = spawn_api(closed_endpoint()).await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/api/health", api.base)).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        let actions: Value = client
            .get(format!("{}/api/actions", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(actions.as_array().unwrap().len(), 5);
        assert_eq!(actions[2]["name"], "Play/Pause Toggle");

        let variables: Value = client
            .get(format!("{}/api/variables", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(variables["values"]["connected"], "No");
        assert_eq!(variables["values"]["title"], "N/A");
        assert_eq!(variables["values"]["duration"], "0:00");
    }

    #[tokio::test]
    async fn test_status_reports_endpoint() {
        let endpoint = closed_endpoint();
        let api = spawn_api(endpoint.clone()).await;

        let status: Value = reqwest::get(format!("{}/api/status", api.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(status["status"]["state"], "disconnected");
        assert_eq!(status["connected"], false);
        assert_eq!(status["endpoint"], endpoint.ws_url());
        assert!(status.get("lastInbound").is_none());
        assert!(status.get("lastOutbound").is_none());

        api.activity.record("media", ActivityDirection::Inbound);
        let status: Value = reqwest::get(format!("{}/api/status", api.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(status["lastInbound"].as_u64().is_some());
        assert!(status.get("lastOutbound").is_none());
    }

    #[tokio::test]
    async fn test_run_action_forwards_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/toggle")
            .with_status(200)
            .with_body(r#"{"success":false,"error":"busy"}"#)
            .create_async()
            .await;
        let api = spawn_api(endpoint_for(&server)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/actions/toggle", api.base))
            .send()
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "busy");
    }

    #[tokio::test]
    async fn test_run_action_errors() {
        let api = spawn_api(closed_endpoint()).await;
        let client = reqwest::Client::new();

        let unknown = client
            .post(format!("{}/api/actions/stop", api.base))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

        let unreachable = client
            .post(format!("{}/api/actions/play", api.base))
            .send()
            .await
            .unwrap();
        assert_eq!(unreachable.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: Value = unreachable.json().await.unwrap();
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditions() {
        let api = spawn_api(closed_endpoint()).await;
        let client = reqwest::Client::new();

        let all: Value = client
            .get(format!("{}/api/conditions", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all["values"]["isDisconnected"], true);
        assert_eq!(all["values"]["isPaused"], true);
        assert_eq!(all["values"]["isPlaying"], false);

        api.driver.store().update(|state| state.connected = true.into());
        let one: Value = client
            .get(format!("{}/api/conditions/isConnected", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(one["value"], true);

        let missing = client
            .get(format!("{}/api/conditions/isMuted", api.base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let artwork: Value = client
            .get(format!("{}/api/conditions/albumArtwork", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(artwork, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_album_artwork_condition() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/art.png")
            .with_status(200)
            .with_body([1u8, 2, 3])
            .create_async()
            .await;
        let api = spawn_api(closed_endpoint()).await;

        let url = format!("{}/art.png", server.url());
        api.driver.store().update(|state| {
            state.track = Some(Track {
                artwork_ref: Some(url),
                ..Track::default()
            })
        });

        let artwork: Value = reqwest::get(format!("{}/api/conditions/albumArtwork", api.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(artwork["png64"], "AQID");
    }

    async fn next_update(
        ws: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    ) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for update")
                .unwrap()
                .unwrap();
            if let tungstenite::Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_websocket_pushes_projection() {
        // Media app that announces itself once connected
        let media = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let media_addr = media.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = media.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(tungstenite::Message::text(
                r#"{"event":"connection_status","data":{"connected":true,"appName":"Player"}}"#,
            ))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let api = spawn_api(MediaConfig {
            host: media_addr.ip().to_string(),
            port: media_addr.port(),
        })
        .await;

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/api/ws", api.addr))
            .await
            .unwrap();

        let initial = next_update(&mut ws).await;
        assert_eq!(initial["type"], "variables");
        assert_eq!(initial["values"]["connected"], "No");
        let initial = next_update(&mut ws).await;
        assert_eq!(initial["type"], "conditions");

        api.driver.start();

        let variables = next_update(&mut ws).await;
        assert_eq!(variables["type"], "variables");
        assert_eq!(variables["values"]["connected"], "Yes");
        assert_eq!(variables["values"]["appName"], "Player");

        let conditions = next_update(&mut ws).await;
        assert_eq!(conditions["type"], "conditions");
        assert_eq!(conditions["values"]["isConnected"], true);
        assert_eq!(conditions["values"]["isDisconnected"], false);

        api.driver.stop().await;
    }
}
