//! Product API module
//!
//! Route paths keep the wire surface of the previous backend so
//! existing clients continue to work unchanged.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/productos", product_routes())
}

fn product_routes() -> Router<ServerState> {
    Router::new()
        .route("/insertar", post(handler::insert))
        .route("/verificar", get(handler::verify))
        .route("/salida/{uuid}", post(handler::consume))
        .route("/{uuid}", get(handler::get_by_id))
}
