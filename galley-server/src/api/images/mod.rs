//! Image API module

mod handler;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/images", image_routes())
        // Serving path matches the URL stored on products
        .route("/api/image/{file_name}", get(handler::serve))
}

fn image_routes() -> Router<ServerState> {
    Router::new()
        .route("/upload", post(handler::upload))
        .route("/update", put(handler::update))
        .route("/delete/{file_name}", delete(handler::remove))
}
