use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::relay::handlers;
use crate::relay::state::RelayState;

pub fn create_router(state: RelayState) -> Router {
    // Origin guard runs in front of the relay route only; /health stays open.
    let api = Router::new()
        .route(
            "/api/data",
            post(handlers::relay_query)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::origin_guard,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
