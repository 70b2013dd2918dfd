use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use pokedex_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    config::SeedAccounts,
    models::{Pokemon, Trainer, TrainerAffiliation},
    repository::{Repository, RepositoryState},
    session::SESSION_COOKIE,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

// --- Test Fixtures ---

const ADMIN_EMAIL: &str = "admin@pokedex.test";
const ADMIN_PASSWORD: &str = "admin-secret";
const USER_EMAIL: &str = "user@pokedex.test";
const USER_PASSWORD: &str = "user-secret";

fn trainer(id: &str, name: &str, region: &str) -> Trainer {
    Trainer {
        id: id.to_string(),
        name: name.to_string(),
        age: 10,
        region: region.to_string(),
        ..Default::default()
    }
}

fn pokemon(id: &str, name: &str, age: i32, trainer_id: &str, trainer_name: &str) -> Pokemon {
    Pokemon {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{} description", name),
        age,
        rarity: "Common".to_string(),
        trainer_affiliation: TrainerAffiliation {
            id: trainer_id.to_string(),
            name: trainer_name.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

/// Builds the full router over an in-memory catalogue with one ADMIN and one USER.
/// POK-006 references a trainer that does not exist.
async fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(InMemoryRepository::with_catalogue(
        vec![
            pokemon("POK-001", "Charmander", 5, "TR-001", "Ash"),
            pokemon("POK-002", "Pikachu", 7, "TR-001", "Ash"),
            pokemon("POK-003", "Charizard", 12, "TR-002", "Brock"),
            pokemon("POK-004", "Charmeleon", 5, "TR-003", "Misty"),
            pokemon("POK-005", "Bulbasaur", 3, "TR-002", "Brock"),
            pokemon("POK-006", "Missingno", 1, "TR-999", "Ghost"),
        ],
        vec![
            trainer("TR-001", "Ash", "Kanto"),
            trainer("TR-002", "Brock", "Kanto"),
            trainer("TR-003", "Misty", "Kanto"),
        ],
    ));

    let state = AppState::new(repo.clone() as RepositoryState, config);
    state
        .auth
        .seed_accounts(Some(&SeedAccounts {
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
            user_email: USER_EMAIL.to_string(),
            user_password: USER_PASSWORD.to_string(),
        }))
        .await
        .expect("seed accounts");

    TestApp {
        router: create_router(state, MemoryStore::default()),
        repo,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Logs in and returns the `name=value` pair of the session cookie.
    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/login",
                &format!("email={}&password={}", email, password),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login for {email} failed");
        session_cookie_of(&response).expect("login sets the session cookie")
    }
}

fn session_cookie_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn item_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

// --- Public routes ---

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_form_describes_fields_for_anonymous() {
    let app = spawn_app().await;

    let response = app.get("/login", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["action"], "/login");
    assert_eq!(body["fields"], serde_json::json!(["email", "password"]));
}

#[tokio::test]
async fn test_login_and_register_forms_redirect_home_when_logged_in() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    for path in ["/login", "/register"] {
        let response = app.get(path, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/");
    }
}

// --- Login / Register / Logout ---

#[tokio::test]
async fn test_login_returns_user_and_http_only_cookie() {
    let app = spawn_app().await;

    let response = app
        .post_form(
            "/login",
            &format!("email={}&password={}", ADMIN_EMAIL, ADMIN_PASSWORD),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let raw_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();
    assert!(raw_cookie.starts_with(SESSION_COOKIE));
    assert!(raw_cookie.contains("HttpOnly"));

    let body = json_body(response).await;
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["role"], "ADMIN");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_error_statuses() {
    let app = spawn_app().await;

    let missing = app.post_form("/login", "email=&password=", None).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .post_form("/login", "email=nobody@nowhere&password=x", None)
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let wrong = app
        .post_form(
            "/login",
            &format!("email={}&password=wrong", USER_EMAIL),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie_of(&wrong).is_none());
}

#[tokio::test]
async fn test_register_then_duplicate_conflicts() {
    let app = spawn_app().await;

    let created = app
        .post_form("/register", "email=gary@pallet.town&password=eevee", None)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    assert!(body["id"].as_str().is_some());

    let duplicate = app
        .post_form("/register", "email=gary@pallet.town&password=other", None)
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(app.repo.count_users().await.unwrap(), 3);

    // The new account logs in with the USER role.
    let login = app
        .post_form("/login", "email=gary@pallet.town&password=eevee", None)
        .await;
    assert_eq!(json_body(login).await["role"], "USER");
}

#[tokio::test]
async fn test_register_without_password_is_bad_request() {
    let app = spawn_app().await;
    let response = app
        .post_form("/register", "email=gary@pallet.town", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_invalidates_the_session() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;
    assert_eq!(
        app.get("/pokemon", Some(&cookie)).await.status(),
        StatusCode::OK
    );

    let logout = app.post_form("/logout", "", Some(&cookie)).await;
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&logout), "/login");

    let after = app.get("/pokemon", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&after), "/login");
}

#[tokio::test]
async fn test_relogin_issues_a_new_session_id() {
    let app = spawn_app().await;
    let first = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app
        .post_form(
            "/login",
            &format!("email={}&password={}", ADMIN_EMAIL, ADMIN_PASSWORD),
            Some(&first),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = session_cookie_of(&response).expect("new session cookie");

    assert_ne!(first, second);
    let landing = json_body(app.get("/", Some(&second)).await).await;
    assert_eq!(landing["user"]["role"], "ADMIN");
}

#[tokio::test]
async fn test_expired_session_redirects_to_login() {
    let app = spawn_app_with(AppConfig {
        session_ttl_minutes: -1,
        ..AppConfig::default()
    })
    .await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app.get("/pokemon", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

// --- Session gate ---

#[tokio::test]
async fn test_protected_routes_redirect_anonymous_to_login() {
    let app = spawn_app().await;

    for path in ["/", "/pokemon", "/pokemon/POK-001", "/trainer", "/trainer/TR-001"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/login", "{path}");
    }

    let edit = app.post_form("/pokemon/POK-001/edit", "age=99", None).await;
    assert_eq!(edit.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&edit), "/login");
}

#[tokio::test]
async fn test_landing_shows_current_user() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app.get("/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], USER_EMAIL);
    assert_eq!(body["user"]["role"], "USER");
}

// --- Overviews ---

#[tokio::test]
async fn test_pokemon_overview_filters_and_sorts() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app
        .get(
            "/pokemon?filterName=char&sortField=age&sortDirection=desc",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(item_ids(&body), vec!["POK-003", "POK-001", "POK-004"]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["filterName"], "char");
    assert_eq!(body["sortField"], "age");
    assert_eq!(body["sortDirection"], "desc");
}

#[tokio::test]
async fn test_pokemon_overview_defaults_to_name_ascending() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let body = json_body(app.get("/pokemon", Some(&cookie)).await).await;

    assert_eq!(
        item_ids(&body),
        vec!["POK-005", "POK-003", "POK-001", "POK-004", "POK-006", "POK-002"]
    );
    assert_eq!(body["sortField"], "name");
    assert_eq!(body["sortDirection"], "asc");
    assert!(body.get("page").is_none());
}

#[tokio::test]
async fn test_pokemon_overview_sorts_by_trainer_and_pages() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let body = json_body(
        app.get(
            "/pokemon?sortField=trainer&page=2&limit=2&hiddenFields=age,rarity",
            Some(&cookie),
        )
        .await,
    )
    .await;

    // Trainer order: Ash (001, 002), Brock (003, 005), Ghost (006), Misty (004).
    assert_eq!(item_ids(&body), vec!["POK-003", "POK-005"]);
    assert_eq!(body["total"], 6);
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["hiddenFields"], serde_json::json!(["age", "rarity"]));
}

#[tokio::test]
async fn test_trainer_overview_filters_by_name() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let body = json_body(app.get("/trainer?filterName=MIS", Some(&cookie)).await).await;

    assert_eq!(item_ids(&body), vec!["TR-003"]);
}

// --- Details ---

#[tokio::test]
async fn test_pokemon_detail_includes_trainer() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app.get("/pokemon/POK-002", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["pokemon"]["name"], "Pikachu");
    assert_eq!(body["pokemon"]["trainerAffiliation"]["id"], "TR-001");
    assert_eq!(body["trainer"]["name"], "Ash");
}

#[tokio::test]
async fn test_pokemon_detail_tolerates_unknown_trainer() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let response = app.get("/pokemon/POK-006", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["pokemon"]["id"], "POK-006");
    assert!(body["trainer"].is_null());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    assert_eq!(
        app.get("/pokemon/POK-404", Some(&cookie)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/trainer/TR-404", Some(&cookie)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_trainer_detail_lists_affiliated_pokemon() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let body = json_body(app.get("/trainer/TR-002", Some(&cookie)).await).await;

    assert_eq!(body["trainer"]["name"], "Brock");
    let ids: Vec<&str> = body["pokemons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["POK-003", "POK-005"]);
}

// --- Admin edit ---

#[tokio::test]
async fn test_user_role_cannot_edit() {
    let app = spawn_app().await;
    let cookie = app.login(USER_EMAIL, USER_PASSWORD).await;

    let form = app.get("/pokemon/POK-001/edit", Some(&cookie)).await;
    assert_eq!(form.status(), StatusCode::FORBIDDEN);

    let update = app
        .post_form("/pokemon/POK-001/edit", "name=Hacked&age=99", Some(&cookie))
        .await;
    assert_eq!(update.status(), StatusCode::FORBIDDEN);

    let stored = app.repo.get_pokemon("POK-001").await.unwrap().unwrap();
    assert_eq!(stored.name, "Charmander");
    assert_eq!(stored.age, 5);
}

#[tokio::test]
async fn test_admin_edit_form_and_partial_update() {
    let app = spawn_app().await;
    let cookie = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let form = app.get("/pokemon/POK-002/edit", Some(&cookie)).await;
    assert_eq!(form.status(), StatusCode::OK);
    let form = json_body(form).await;
    assert_eq!(form["name"], "Pikachu");
    assert_eq!(form["age"], 7);

    let update = app
        .post_form(
            "/pokemon/POK-002/edit",
            "name=Raichu&age=9&rarity=Rare",
            Some(&cookie),
        )
        .await;
    assert_eq!(update.status(), StatusCode::OK);
    let updated = json_body(update).await;
    assert_eq!(updated["name"], "Raichu");
    assert_eq!(updated["age"], 9);
    assert_eq!(updated["rarity"], "Rare");
    // Fields left out of the form are untouched.
    assert_eq!(updated["description"], "Pikachu description");
    assert_eq!(updated["trainerAffiliation"]["id"], "TR-001");

    let stored = app.repo.get_pokemon("POK-002").await.unwrap().unwrap();
    assert_eq!(stored.name, "Raichu");
    assert_eq!(stored.age, 9);
}

#[tokio::test]
async fn test_admin_edit_rejects_invalid_values() {
    let app = spawn_app().await;
    let cookie = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let negative = app
        .post_form("/pokemon/POK-001/edit", "age=-3", Some(&cookie))
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let blank = app
        .post_form("/pokemon/POK-001/edit", "name=%20%20", Some(&cookie))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let stored = app.repo.get_pokemon("POK-001").await.unwrap().unwrap();
    assert_eq!(stored.age, 5);
    assert_eq!(stored.name, "Charmander");
}

#[tokio::test]
async fn test_admin_edit_unknown_id_is_not_found() {
    let app = spawn_app().await;
    let cookie = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let form = app.get("/pokemon/POK-404/edit", Some(&cookie)).await;
    assert_eq!(form.status(), StatusCode::NOT_FOUND);

    let update = app
        .post_form("/pokemon/POK-404/edit", "age=1", Some(&cookie))
        .await;
    assert_eq!(update.status(), StatusCode::NOT_FOUND);
}
