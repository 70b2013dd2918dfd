use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Catalogue Records (Mapped to Database and Seed JSON) ---

/// TrainerAffiliation
///
/// The trainer reference embedded in every Pokémon document. It is a copy of the
/// trainer's display fields, not a foreign key: nothing guarantees that `id`
/// names an existing `Trainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TrainerAffiliation {
    #[sqlx(rename = "trainer_id")]
    pub id: String,
    #[sqlx(rename = "trainer_name")]
    pub name: String,
    #[sqlx(rename = "trainer_region")]
    pub region: String,
    #[sqlx(rename = "trainer_image_url")]
    pub image_url: String,
}

/// Pokemon
///
/// A catalogue record from the `pokemons` table. Field names serialize in camelCase
/// so the seed documents deserialize directly into this struct; missing fields take
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Pokemon {
    /// Unique identifier, formatted "POK-NNN".
    #[schema(example = "POK-001")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub age: i32,
    pub is_active: bool,
    /// ISO-8601 date string, kept verbatim from the source document.
    pub birth_date: String,
    pub image_url: String,
    pub rarity: String,
    pub abilities: Vec<String>,
    #[sqlx(flatten)]
    pub trainer_affiliation: TrainerAffiliation,
}

/// Trainer
///
/// A catalogue record from the `trainers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Trainer {
    pub id: String,
    pub name: String,
    pub description: String,
    pub age: i32,
    pub is_active: bool,
    pub birth_date: String,
    pub image_url: String,
    pub region: String,
    pub hobbies: Vec<String>,
}

// --- Accounts ---

/// Role
///
/// The closed set of account roles. Stored as the upper-case strings "ADMIN" and
/// "USER"; any other stored value is rejected when the row is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// UserAccount
///
/// The stored account, including the bcrypt hash. Not `Serialize`: it never leaves
/// the server. Use `SessionUser` for anything client-facing.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// SessionUser
///
/// The account as held in a session and returned after login: the password hash
/// is stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&UserAccount> for SessionUser {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// Credentials
///
/// Form payload shared by `POST /login` and `POST /register`. Missing fields
/// deserialize as empty strings so the service reports a validation error instead
/// of the extractor rejecting the request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// UpdatePokemonRequest
///
/// Partial update for `POST /pokemon/{id}/edit`. Only the provided fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePokemonRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
}

impl UpdatePokemonRequest {
    /// Rejects a negative age and provided-but-blank name or rarity.
    pub fn validate(&self) -> Result<(), String> {
        if self.age.is_some_and(|age| age < 0) {
            return Err("age must not be negative".to_string());
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err("name must not be blank".to_string());
        }
        if self.rarity.as_deref().is_some_and(|rarity| rarity.trim().is_empty()) {
            return Err("rarity must not be blank".to_string());
        }
        Ok(())
    }

    /// Applies the provided fields to `pokemon` in place.
    pub fn apply_to(&self, pokemon: &mut Pokemon) {
        if let Some(name) = &self.name {
            pokemon.name = name.clone();
        }
        if let Some(description) = &self.description {
            pokemon.description = description.clone();
        }
        if let Some(age) = self.age {
            pokemon.age = age;
        }
        if let Some(image_url) = &self.image_url {
            pokemon.image_url = image_url.clone();
        }
        if let Some(rarity) = &self.rarity {
            pokemon.rarity = rarity.clone();
        }
    }
}

// --- View Models (Output Schemas) ---

/// PokemonEditForm
///
/// The editable subset of a Pokémon, returned by `GET /pokemon/{id}/edit`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PokemonEditForm {
    pub id: String,
    pub name: String,
    pub description: String,
    pub age: i32,
    pub image_url: String,
    pub rarity: String,
}

impl From<Pokemon> for PokemonEditForm {
    fn from(p: Pokemon) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            age: p.age,
            image_url: p.image_url,
            rarity: p.rarity,
        }
    }
}

/// PokemonDetail
///
/// `GET /pokemon/{id}`: the record plus its affiliated trainer. `trainer` is `None`
/// when the embedded reference points at no known trainer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PokemonDetail {
    pub pokemon: Pokemon,
    pub trainer: Option<Trainer>,
}

/// TrainerDetail
///
/// `GET /trainer/{id}`: the trainer plus every Pokémon affiliated with it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TrainerDetail {
    pub trainer: Trainer,
    pub pokemons: Vec<Pokemon>,
}

/// ListResponse
///
/// View model for the overview pages. Echoes the interpreted query so the client can
/// render the current filter and sort state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    /// Number of matching records before paging.
    pub total: usize,
    pub filter_name: String,
    pub sort_field: String,
    pub sort_direction: String,
    pub hidden_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// RegisterResponse
///
/// `POST /register`: the identifier of the newly created account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterResponse {
    pub id: Uuid,
}

/// Welcome
///
/// `GET /`: the landing view for a logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Welcome {
    pub title: String,
    pub message: String,
    pub user: SessionUser,
}

/// FormDescription
///
/// `GET /login` and `GET /register`: tells a client which form fields to post where.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormDescription {
    pub action: String,
    pub method: String,
    pub fields: Vec<String>,
}
