use crate::{
    error::{AppError, AppResult},
    models::{Pokemon, Role, Trainer, UpdatePokemonRequest, UserAccount},
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// The data store adapter: one contract over the three keyed record sets
/// (Pokémon, Trainer, User). Handlers and services only see this trait, so the
/// Postgres and in-memory implementations are interchangeable.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Pokémon ---
    async fn list_pokemon(&self) -> AppResult<Vec<Pokemon>>;
    async fn get_pokemon(&self, id: &str) -> AppResult<Option<Pokemon>>;
    // Pokémon whose embedded trainer reference points at `trainer_id`.
    async fn pokemon_by_trainer(&self, trainer_id: &str) -> AppResult<Vec<Pokemon>>;
    async fn count_pokemon(&self) -> AppResult<i64>;
    // Bulk insert used by the seed loader. Existing ids are skipped.
    async fn insert_pokemon(&self, pokemon: Vec<Pokemon>) -> AppResult<u64>;
    // Partial update. Returns `None` when no record matched the id.
    async fn update_pokemon(
        &self,
        id: &str,
        changes: &UpdatePokemonRequest,
    ) -> AppResult<Option<Pokemon>>;

    // --- Trainers ---
    async fn list_trainers(&self) -> AppResult<Vec<Trainer>>;
    async fn get_trainer(&self, id: &str) -> AppResult<Option<Trainer>>;
    async fn count_trainers(&self) -> AppResult<i64>;
    async fn insert_trainers(&self, trainers: Vec<Trainer>) -> AppResult<u64>;

    // --- Accounts ---
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;
    // Fails with `AppError::Conflict` when the email is already taken.
    async fn create_user(&self, user: UserAccount) -> AppResult<UserAccount>;
    async fn count_users(&self) -> AppResult<i64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const POKEMON_COLUMNS: &str = "id, name, description, age, is_active, birth_date, image_url, \
     rarity, abilities, trainer_id, trainer_name, trainer_region, trainer_image_url";

const TRAINER_COLUMNS: &str =
    "id, name, description, age, is_active, birth_date, image_url, region, hobbies";

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS pokemons (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        age INTEGER NOT NULL DEFAULT 0 CHECK (age >= 0),
        is_active BOOLEAN NOT NULL DEFAULT FALSE,
        birth_date TEXT NOT NULL DEFAULT '',
        image_url TEXT NOT NULL DEFAULT '',
        rarity TEXT NOT NULL DEFAULT '',
        abilities TEXT[] NOT NULL DEFAULT '{}',
        trainer_id TEXT NOT NULL DEFAULT '',
        trainer_name TEXT NOT NULL DEFAULT '',
        trainer_region TEXT NOT NULL DEFAULT '',
        trainer_image_url TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trainers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        age INTEGER NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT FALSE,
        birth_date TEXT NOT NULL DEFAULT '',
        image_url TEXT NOT NULL DEFAULT '',
        region TEXT NOT NULL DEFAULT '',
        hobbies TEXT[] NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('ADMIN', 'USER'))
    )
    "#,
];

/// UserRow
///
/// Raw `users` row. The role column is text; it becomes a `Role` in `TryFrom`.
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(AppError::Storage)?;
        Ok(UserAccount {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
        })
    }
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are built at runtime
/// (`query_as` + `FromRow`) so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// migrate
    ///
    /// Creates the three tables if they do not exist yet. Safe to run on every boot.
    pub async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_pokemon(&self) -> AppResult<Vec<Pokemon>> {
        let sql = format!("SELECT {} FROM pokemons ORDER BY id", POKEMON_COLUMNS);
        Ok(sqlx::query_as::<_, Pokemon>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_pokemon(&self, id: &str) -> AppResult<Option<Pokemon>> {
        let sql = format!("SELECT {} FROM pokemons WHERE id = $1", POKEMON_COLUMNS);
        Ok(sqlx::query_as::<_, Pokemon>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn pokemon_by_trainer(&self, trainer_id: &str) -> AppResult<Vec<Pokemon>> {
        let sql = format!(
            "SELECT {} FROM pokemons WHERE trainer_id = $1 ORDER BY id",
            POKEMON_COLUMNS
        );
        Ok(sqlx::query_as::<_, Pokemon>(&sql)
            .bind(trainer_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_pokemon(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pokemons")
            .fetch_one(&self.pool)
            .await?)
    }

    /// insert_pokemon
    ///
    /// Inserts the whole batch in one transaction: a seed load either lands completely
    /// or not at all.
    async fn insert_pokemon(&self, pokemon: Vec<Pokemon>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for p in pokemon {
            let result = sqlx::query(
                r#"
                INSERT INTO pokemons (
                    id, name, description, age, is_active, birth_date, image_url, rarity,
                    abilities, trainer_id, trainer_name, trainer_region, trainer_image_url
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(p.id)
            .bind(p.name)
            .bind(p.description)
            .bind(p.age)
            .bind(p.is_active)
            .bind(p.birth_date)
            .bind(p.image_url)
            .bind(p.rarity)
            .bind(p.abilities)
            .bind(p.trainer_affiliation.id)
            .bind(p.trainer_affiliation.name)
            .bind(p.trainer_affiliation.region)
            .bind(p.trainer_affiliation.image_url)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// update_pokemon
    ///
    /// Uses COALESCE so absent fields keep their stored value. `RETURNING` yields no
    /// row when the id matched nothing.
    async fn update_pokemon(
        &self,
        id: &str,
        changes: &UpdatePokemonRequest,
    ) -> AppResult<Option<Pokemon>> {
        let sql = format!(
            r#"
            UPDATE pokemons
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                age = COALESCE($4, age),
                image_url = COALESCE($5, image_url),
                rarity = COALESCE($6, rarity)
            WHERE id = $1
            RETURNING {}
            "#,
            POKEMON_COLUMNS
        );
        Ok(sqlx::query_as::<_, Pokemon>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.age)
            .bind(changes.image_url.as_deref())
            .bind(changes.rarity.as_deref())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_trainers(&self) -> AppResult<Vec<Trainer>> {
        let sql = format!("SELECT {} FROM trainers ORDER BY id", TRAINER_COLUMNS);
        Ok(sqlx::query_as::<_, Trainer>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_trainer(&self, id: &str) -> AppResult<Option<Trainer>> {
        let sql = format!("SELECT {} FROM trainers WHERE id = $1", TRAINER_COLUMNS);
        Ok(sqlx::query_as::<_, Trainer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_trainers(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trainers")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert_trainers(&self, trainers: Vec<Trainer>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for t in trainers {
            let result = sqlx::query(
                r#"
                INSERT INTO trainers (
                    id, name, description, age, is_active, birth_date, image_url, region, hobbies
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(t.id)
            .bind(t.name)
            .bind(t.description)
            .bind(t.age)
            .bind(t.is_active)
            .bind(t.birth_date)
            .bind(t.image_url)
            .bind(t.region)
            .bind(t.hobbies)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(UserAccount::try_from)
        .transpose()
    }

    /// create_user
    ///
    /// The UNIQUE constraint on `email` backs up the service-level duplicate check;
    /// a violation surfaces as `AppError::Conflict` via `From<sqlx::Error>`.
    async fn create_user(&self, user: UserAccount) -> AppResult<UserAccount> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, role
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        UserAccount::try_from(row)
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }
}

// --- In-Memory ---

/// InMemoryRepository
///
/// A process-local `Repository` used for local runs without `DATABASE_URL` and
/// throughout the test suite. Each record set keeps insertion order.
#[derive(Default)]
pub struct InMemoryRepository {
    pokemon: RwLock<Vec<Pokemon>>,
    trainers: RwLock<Vec<Trainer>>,
    users: RwLock<Vec<UserAccount>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository pre-filled with catalogue records.
    pub fn with_catalogue(pokemon: Vec<Pokemon>, trainers: Vec<Trainer>) -> Self {
        Self {
            pokemon: RwLock::new(pokemon),
            trainers: RwLock::new(trainers),
            users: RwLock::new(Vec::new()),
        }
    }
}

fn len_as_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_pokemon(&self) -> AppResult<Vec<Pokemon>> {
        Ok(self.pokemon.read().await.clone())
    }

    async fn get_pokemon(&self, id: &str) -> AppResult<Option<Pokemon>> {
        Ok(self.pokemon.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn pokemon_by_trainer(&self, trainer_id: &str) -> AppResult<Vec<Pokemon>> {
        Ok(self
            .pokemon
            .read()
            .await
            .iter()
            .filter(|p| p.trainer_affiliation.id == trainer_id)
            .cloned()
            .collect())
    }

    async fn count_pokemon(&self) -> AppResult<i64> {
        Ok(len_as_i64(self.pokemon.read().await.len()))
    }

    async fn insert_pokemon(&self, pokemon: Vec<Pokemon>) -> AppResult<u64> {
        let mut store = self.pokemon.write().await;
        let mut inserted = 0;
        for p in pokemon {
            if store.iter().all(|existing| existing.id != p.id) {
                store.push(p);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn update_pokemon(
        &self,
        id: &str,
        changes: &UpdatePokemonRequest,
    ) -> AppResult<Option<Pokemon>> {
        let mut store = self.pokemon.write().await;
        Ok(store.iter_mut().find(|p| p.id == id).map(|p| {
            changes.apply_to(p);
            p.clone()
        }))
    }

    async fn list_trainers(&self) -> AppResult<Vec<Trainer>> {
        Ok(self.trainers.read().await.clone())
    }

    async fn get_trainer(&self, id: &str) -> AppResult<Option<Trainer>> {
        Ok(self.trainers.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn count_trainers(&self) -> AppResult<i64> {
        Ok(len_as_i64(self.trainers.read().await.len()))
    }

    async fn insert_trainers(&self, trainers: Vec<Trainer>) -> AppResult<u64> {
        let mut store = self.trainers.write().await;
        let mut inserted = 0;
        for t in trainers {
            if store.iter().all(|existing| existing.id != t.id) {
                store.push(t);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: UserAccount) -> AppResult<UserAccount> {
        let mut store = self.users.write().await;
        if store.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        store.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(len_as_i64(self.users.read().await.len()))
    }
}
