use uuid::Uuid;

use crate::{
    config::SeedAccounts,
    error::{AppError, AppResult},
    models::{Role, SessionUser, UserAccount},
    repository::RepositoryState,
};

/// AuthService
///
/// Account registration, credential checks and the first-boot account seed.
/// Passwords are only ever stored as bcrypt hashes. Hashing and verification run
/// on the blocking pool so they never stall the async workers.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(repo: RepositoryState, hash_cost: u32) -> Self {
        Self { repo, hash_cost }
    }

    /// register
    ///
    /// Creates a USER-role account and returns its id.
    ///
    /// # Errors
    /// - `Validation` when email or password is empty (checked before any storage access).
    /// - `Conflict` when the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<Uuid> {
        let email = require_credentials(email, password)?;

        if self.repo.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("user already exists".to_string()));
        }

        let account = self.new_account(email, password, Role::User).await?;
        let created = self.repo.create_user(account).await?;
        tracing::info!(user = %created.email, "registered new account");
        Ok(created.id)
    }

    /// login
    ///
    /// Checks the credentials and returns the account without its hash, ready to be
    /// stored in a session.
    ///
    /// # Errors
    /// - `Validation` when email or password is empty (checked before any storage access).
    /// - `NotFound` when no account has this email.
    /// - `Auth` when the password does not match.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<SessionUser> {
        let email = require_credentials(email, password)?;

        let account = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;

        if !matches {
            tracing::info!(user = %account.email, "login rejected: password mismatch");
            return Err(AppError::Auth);
        }

        Ok(SessionUser::from(&account))
    }

    /// seed_accounts
    ///
    /// First-boot only: when the user store is empty, creates exactly one ADMIN and one
    /// USER account from the configured credentials. Does nothing if any account exists.
    ///
    /// # Errors
    /// `Config` when seeding is needed but the credentials are not configured, or
    /// both accounts would share one email.
    pub async fn seed_accounts(&self, accounts: Option<&SeedAccounts>) -> AppResult<()> {
        if self.repo.count_users().await? > 0 {
            tracing::debug!("user store already populated, skipping account seed");
            return Ok(());
        }

        let accounts = accounts.ok_or_else(|| {
            AppError::Config(
                "ADMIN_EMAIL, ADMIN_PASSWORD, USER_EMAIL and USER_PASSWORD must be set".to_string(),
            )
        })?;

        if accounts
            .admin_email
            .trim()
            .eq_ignore_ascii_case(accounts.user_email.trim())
        {
            return Err(AppError::Config(
                "ADMIN_EMAIL and USER_EMAIL must differ".to_string(),
            ));
        }

        let admin = self
            .new_account(&accounts.admin_email, &accounts.admin_password, Role::Admin)
            .await?;
        let user = self
            .new_account(&accounts.user_email, &accounts.user_password, Role::User)
            .await?;

        self.repo.create_user(admin).await?;
        self.repo.create_user(user).await?;
        tracing::info!("seeded initial ADMIN and USER accounts");
        Ok(())
    }

    async fn new_account(&self, email: &str, password: &str, role: Role) -> AppResult<UserAccount> {
        let password = password.to_string();
        let cost = self.hash_cost;
        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        Ok(UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            role,
        })
    }
}

/// Rejects empty input and returns the trimmed email.
fn require_credentials<'a>(email: &'a str, password: &str) -> AppResult<&'a str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }
    Ok(email)
}
