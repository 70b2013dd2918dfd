use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes restricted to the ADMIN role. They sit behind the same session gate as the
/// authenticated routes (anonymous → redirect), and each handler takes the `AdminUser`
/// extractor, which answers 403 to a logged-in USER.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /pokemon/{id}/edit
        // Edit form data, and the partial update of name, description, age, imageUrl
        // and rarity. Trainers have no edit path.
        .route(
            "/pokemon/{id}/edit",
            get(handlers::get_pokemon_edit).post(handlers::update_pokemon),
        )
}
