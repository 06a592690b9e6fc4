//! HTTP CRUD service for contact records (name, email, phone) stored in a
//! single SQLite table.
//!
//! | Method          | Path            | Description                       |
//! |-----------------|-----------------|-----------------------------------|
//! | `POST`          | `/contact`      | Create, skipping exact duplicates |
//! | `GET`           | `/contact`      | `{ "contacts": [...] }`           |
//! | `GET`           | `/contact/:id`  | One contact                       |
//! | `PUT` / `PATCH` | `/contact/:id`  | Overwrite the supplied fields     |
//! | `DELETE`        | `/contact/:id`  | Delete                            |

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::store::ContactStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ContactStore,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/contact",
            post(handlers::create_contact)
                .get(handlers::list_contacts)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/contact/:id",
            get(handlers::get_contact)
                .put(handlers::update_contact)
                .patch(handlers::update_contact)
                .delete(handlers::delete_contact)
                .fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
