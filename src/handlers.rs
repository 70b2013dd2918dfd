use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{
        Credentials, FormDescription, ListResponse, Pokemon, PokemonDetail, PokemonEditForm,
        RegisterResponse, SessionUser, Trainer, TrainerDetail, UpdatePokemonRequest, Welcome,
    },
    query::{self, ListParams, ListQuery, Queryable},
    session::{self, AdminUser, CurrentUser, LOGIN_PATH, Session},
};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

// --- Helpers ---

/// Runs the query pipeline over `records` and wraps the result in the list view model.
fn list_view<T>(records: &[T], list_query: &ListQuery) -> ListResponse<T>
where
    T: Queryable + Clone,
{
    let params = ListParams::from(list_query);
    let outcome = query::run(records, &params);
    ListResponse {
        items: outcome.items,
        total: outcome.total,
        filter_name: params.filter_name,
        sort_field: params.sort_field,
        sort_direction: params.direction.as_str().to_string(),
        hidden_fields: params.hidden_fields,
        page: params.page.map(|p| p.page),
        limit: params.page.map(|p| p.limit),
    }
}

/// Logged-in visitors have no use for the login and register forms.
fn form_or_home(session: &Session, action: &str) -> Response {
    if session.user().is_some() {
        return Redirect::to("/").into_response();
    }
    Json(FormDescription {
        action: action.to_string(),
        method: "POST".to_string(),
        fields: vec!["email".to_string(), "password".to_string()],
    })
    .into_response()
}

// --- Handlers ---

/// landing
///
/// [Session Route] The welcome view for the logged-in user.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome", body = Welcome),
        (status = 303, description = "Not logged in, redirected to /login")
    )
)]
pub async fn landing(CurrentUser(user): CurrentUser) -> Json<Welcome> {
    Json(Welcome {
        title: "Welcome".to_string(),
        message: "Welcome to the Pokémon & Trainer App".to_string(),
        user,
    })
}

/// list_pokemon
///
/// [Session Route] Lists Pokémon, filtered by name and sorted by any scalar field.
/// `sortField=trainer` orders by the affiliated trainer's name.
#[utoipa::path(
    get,
    path = "/pokemon",
    params(ListQuery),
    responses((status = 200, description = "Filtered and sorted Pokémon", body = ListResponse<Pokemon>))
)]
pub async fn list_pokemon(
    State(state): State<AppState>,
    Query(list_query): Query<ListQuery>,
) -> AppResult<Json<ListResponse<Pokemon>>> {
    let pokemon = state.repo.list_pokemon().await?;
    Ok(Json(list_view(&pokemon, &list_query)))
}

/// get_pokemon_detail
///
/// [Session Route] One Pokémon with its affiliated trainer. A reference to an unknown
/// trainer is tolerated: the detail is served with `trainer: null`.
#[utoipa::path(
    get,
    path = "/pokemon/{id}",
    params(("id" = String, Path, description = "Pokémon id, e.g. POK-001")),
    responses(
        (status = 200, description = "Found", body = PokemonDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_pokemon_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PokemonDetail>> {
    let pokemon = state
        .repo
        .get_pokemon(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pokemon {} not found", id)))?;

    let trainer = state
        .repo
        .get_trainer(&pokemon.trainer_affiliation.id)
        .await?;
    if trainer.is_none() {
        tracing::warn!(
            pokemon = %pokemon.id,
            trainer = %pokemon.trainer_affiliation.id,
            "pokemon references an unknown trainer"
        );
    }

    Ok(Json(PokemonDetail { pokemon, trainer }))
}

/// get_pokemon_edit
///
/// [Admin Route] The current editable fields of a Pokémon.
///
/// *RBAC*: `AdminUser` refuses non-admin sessions with 403.
#[utoipa::path(
    get,
    path = "/pokemon/{id}/edit",
    params(("id" = String, Path, description = "Pokémon id")),
    responses(
        (status = 200, description = "Edit form", body = PokemonEditForm),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_pokemon_edit(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PokemonEditForm>> {
    let pokemon = state
        .repo
        .get_pokemon(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pokemon {} not found", id)))?;
    Ok(Json(PokemonEditForm::from(pokemon)))
}

/// update_pokemon
///
/// [Admin Route] Overwrites any of name, description, age, imageUrl and rarity.
/// Fields left out of the form keep their stored value.
///
/// *RBAC*: `AdminUser` refuses non-admin sessions with 403 before the store is touched.
#[utoipa::path(
    post,
    path = "/pokemon/{id}/edit",
    params(("id" = String, Path, description = "Pokémon id")),
    request_body(content = UpdatePokemonRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Updated", body = Pokemon),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_pokemon(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(changes): Form<UpdatePokemonRequest>,
) -> AppResult<Json<Pokemon>> {
    changes.validate().map_err(AppError::Validation)?;

    let updated = state
        .repo
        .update_pokemon(&id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pokemon {} not found", id)))?;

    tracing::info!(pokemon = %updated.id, admin = %admin.email, "pokemon updated");
    Ok(Json(updated))
}

/// list_trainers
///
/// [Session Route] Lists trainers, filtered by name and sorted by any scalar field.
#[utoipa::path(
    get,
    path = "/trainer",
    params(ListQuery),
    responses((status = 200, description = "Filtered and sorted trainers", body = ListResponse<Trainer>))
)]
pub async fn list_trainers(
    State(state): State<AppState>,
    Query(list_query): Query<ListQuery>,
) -> AppResult<Json<ListResponse<Trainer>>> {
    let trainers = state.repo.list_trainers().await?;
    Ok(Json(list_view(&trainers, &list_query)))
}

/// get_trainer_detail
///
/// [Session Route] One trainer with every Pokémon affiliated with it.
#[utoipa::path(
    get,
    path = "/trainer/{id}",
    params(("id" = String, Path, description = "Trainer id")),
    responses(
        (status = 200, description = "Found", body = TrainerDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_trainer_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TrainerDetail>> {
    let trainer = state
        .repo
        .get_trainer(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trainer {} not found", id)))?;
    let pokemons = state.repo.pokemon_by_trainer(&trainer.id).await?;
    Ok(Json(TrainerDetail { trainer, pokemons }))
}

/// login_form
///
/// [Public Route] Describes the login form; redirects home if already logged in.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Form description", body = FormDescription),
        (status = 303, description = "Already logged in, redirected to /")
    )
)]
pub async fn login_form(session: Session) -> Response {
    form_or_home(&session, LOGIN_PATH)
}

/// login
///
/// [Public Route] Checks the credentials and binds the account to a fresh session.
/// The session layer sets the cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in", body = SessionUser),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    handle: tower_sessions::Session,
    Form(credentials): Form<Credentials>,
) -> AppResult<Json<SessionUser>> {
    let user = state
        .auth
        .login(&credentials.email, &credentials.password)
        .await?;

    session::sign_in(&handle, &user).await?;
    tracing::info!(user = %user.email, role = %user.role, "session started");

    Ok(Json(user))
}

/// register_form
///
/// [Public Route] Describes the registration form; redirects home if already logged in.
#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Form description", body = FormDescription),
        (status = 303, description = "Already logged in, redirected to /")
    )
)]
pub async fn register_form(session: Session) -> Response {
    form_or_home(&session, "/register")
}

/// register
///
/// [Public Route] Self-registration. New accounts always get the USER role.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Form(credentials): Form<Credentials>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let id = state
        .auth
        .register(&credentials.email, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

/// logout
///
/// [Session Route] Deletes the session record, clears the cookie and sends the client
/// to login.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Logged out, redirected to /login"))
)]
pub async fn logout(handle: tower_sessions::Session) -> AppResult<Redirect> {
    session::sign_out(&handle).await?;
    Ok(Redirect::to(LOGIN_PATH))
}
