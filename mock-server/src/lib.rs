use std::{collections::HashMap, convert::Infallible, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Body served by `/ASP/getbackendinfo.aspx` with a `Content-Length`.
pub const BACKEND_INFO: &str = "O\nH\tver\tnow\nD\t0.1\t1140000000\n$\t4\t$";

/// Pieces streamed by `/ASP/stream` without a length, so hyper frames them
/// with chunked transfer-encoding.
pub const STREAM_CHUNKS: [&str; 4] = [
    "O\nH\tpid\tnick\n",
    "D\t43\tPlayerOne\n",
    "D\t44\tPlayer\r\nTwo\n",
    "$\t3\t$",
];

/// Reply to an accepted snapshot.
pub const SNAPSHOT_ACCEPTED: &str = "O\nH\tresponse\nD\tOK\n$\tOK\t$";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Snapshot>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/ASP/getbackendinfo.aspx", get(backend_info))
        .route("/ASP/stream", get(stream_players))
        .route("/ASP/bf2statistics.php", post(submit_snapshot))
        .route("/ASP/snapshots", get(list_snapshots))
        .route("/ASP/snapshots/{id}", get(get_snapshot))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn backend_info() -> &'static str {
    BACKEND_INFO
}

async fn stream_players() -> Body {
    let chunks = STREAM_CHUNKS.into_iter().map(Ok::<_, Infallible>);
    Body::from_stream(futures::stream::iter(chunks))
}

async fn submit_snapshot(State(db): State<Db>, body: String) -> (StatusCode, &'static str) {
    let snapshot = Snapshot {
        id: Uuid::new_v4(),
        body,
    };
    db.write().await.insert(snapshot.id, snapshot);
    (StatusCode::OK, SNAPSHOT_ACCEPTED)
}

async fn list_snapshots(State(db): State<Db>) -> Json<Vec<Snapshot>> {
    let snapshots = db.read().await;
    Json(snapshots.values().cloned().collect())
}

async fn get_snapshot(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<String, StatusCode> {
    let snapshots = db.read().await;
    snapshots
        .get(&id)
        .map(|s| s.body.clone())
        .ok_or(StatusCode::NOT_FOUND)
}
