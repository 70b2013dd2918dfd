use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any logged-in user, ADMIN or USER. The session gate layered over this
/// router in `create_router` redirects anonymous requests to `/login` before any
/// handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /
        // Landing view showing the current user.
        .route("/", get(handlers::landing))
        // GET /pokemon?filterName=...&sortField=...&sortDirection=...
        // Overview with name filter, sorting ("trainer" sorts by trainer name) and paging.
        .route("/pokemon", get(handlers::list_pokemon))
        // GET /pokemon/{id}
        // Detail view including the affiliated trainer, when it exists.
        .route("/pokemon/{id}", get(handlers::get_pokemon_detail))
        // GET /trainer?filterName=...&sortField=...&sortDirection=...
        .route("/trainer", get(handlers::list_trainers))
        // GET /trainer/{id}
        // Detail view including every affiliated Pokémon.
        .route("/trainer/{id}", get(handlers::get_trainer_detail))
        // POST /logout
        // Destroys the server-side session and clears the cookie.
        .route("/logout", post(handlers::logout))
}
