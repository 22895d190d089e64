//! Route definitions for the bakery production server

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ingredient catalog
        .nest("/ingredients", ingredient_routes())
        // Stock lots and movements
        .nest("/stock", stock_routes())
        // Order pipeline
        .nest("/orders", order_routes())
        // Pipeline configuration
        .nest("/pipeline-config", pipeline_config_routes())
}

/// Ingredient catalog routes
fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route("/:ingredient_id", get(handlers::get_ingredient))
        .route("/:ingredient_id/lots", get(handlers::list_lots))
        .route("/:ingredient_id/cost", get(handlers::get_ingredient_cost))
}

/// Stock management routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/lots", post(handlers::create_lot))
        .route("/lots/:lot_id", get(handlers::get_lot))
        .route("/lots/:lot_id/moves", get(handlers::list_lot_moves))
        .route("/lots/:lot_id/discard", post(handlers::discard_from_lot))
        .route("/expired/sweep", post(handlers::expire_sweep))
        .route("/valuation", get(handlers::get_stock_valuation))
}

/// Order pipeline routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/advance", post(handlers::advance_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/:order_id/paid", put(handlers::set_order_paid))
}

/// Pipeline configuration routes
fn pipeline_config_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::get_pipeline_config).put(handlers::update_pipeline_config),
    )
}
