//! Admin and user-facing HTTP routes.
//!
//! - `POST   /admin/persona`, `PATCH|DELETE /admin/persona/{id}`
//! - `GET    /persona`, `GET /persona/{id}`
//! - `GET    /persona-utils/prompt-explorer`
//! - `GET    /persona-utils/list-available-models`, `GET /persona-utils/default-model`
//! - `/manage/admin/slack-bot/config[/{id}]` and `/manage/admin/slack-bot/tokens`

pub mod persona;
pub mod slack_bot;

use axum::{middleware, Router};

use crate::auth::require_admin;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .merge(persona::admin_routes())
        .nest("/manage", slack_bot::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new().merge(persona::routes()).merge(admin).with_state(state)
}
