use serde::de::DeserializeOwned;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Pokemon, Trainer},
    repository::RepositoryState,
};

/// SeedReport
///
/// How many records each seed step inserted. A skipped or failed step reports 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub pokemon: u64,
    pub trainers: u64,
}

/// fetch_json
///
/// One attempt, no retries. Network failures, non-success statuses and malformed
/// bodies all become `AppError::UpstreamFetch`.
pub async fn fetch_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> AppResult<T> {
    let upstream = |reason: String| AppError::UpstreamFetch {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| upstream(e.to_string()))?;

    if !response.status().is_success() {
        return Err(upstream(format!("status {}", response.status())));
    }

    response.json::<T>().await.map_err(|e| upstream(e.to_string()))
}

/// seed_catalogue
///
/// Fills the Pokémon and Trainer stores from the configured remote documents, each
/// only if that store is empty. A failed fetch or a rejected insert batch is logged
/// and leaves that store empty; the other source is still loaded. Only a failure to
/// count the existing records is returned.
pub async fn seed_catalogue(
    repo: &RepositoryState,
    client: &reqwest::Client,
    config: &AppConfig,
) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    if repo.count_pokemon().await? == 0 {
        tracing::info!(url = %config.pokemon_seed_url, "pokemon store is empty, loading seed data");
        match fetch_json::<Vec<Pokemon>>(client, &config.pokemon_seed_url).await {
            Ok(pokemon) => match repo.insert_pokemon(pokemon).await {
                Ok(inserted) => {
                    report.pokemon = inserted;
                    tracing::info!(inserted, "inserted pokemon seed data");
                }
                Err(e) => tracing::error!(error = %e, "failed to store pokemon seed data"),
            },
            Err(e) => tracing::error!(error = %e, "skipping pokemon seed"),
        }
    }

    if repo.count_trainers().await? == 0 {
        tracing::info!(url = %config.trainer_seed_url, "trainer store is empty, loading seed data");
        match fetch_json::<Vec<Trainer>>(client, &config.trainer_seed_url).await {
            Ok(trainers) => match repo.insert_trainers(trainers).await {
                Ok(inserted) => {
                    report.trainers = inserted;
                    tracing::info!(inserted, "inserted trainer seed data");
                }
                Err(e) => tracing::error!(error = %e, "failed to store trainer seed data"),
            },
            Err(e) => tracing::error!(error = %e, "skipping trainer seed"),
        }
    }

    Ok(report)
}
