use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::{routing::get, Json};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    auth, conflicts,
    context::ServerContext,
    docs, matches, names,
    serialized::Health,
    sessions, votes,
};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, body = Health)
    )
)]
async fn health() -> Json<Health> {
    Json(Health::now())
}

/// Starts the namematch server
pub async fn run_server(context: ServerContext) {
    let port = env::var("NAMEMATCH_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .nest("/names", names::router())
        .nest("/votes", votes::router())
        .nest("/matches", matches::router())
        .nest("/conflicts", conflicts::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs")
}
