use serde_json::json;
use warp::{Filter, Rejection, Reply};

/// Liveness probe; needs no session.
pub fn health_routes() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "healthy": true })))
}
