//! Background housekeeping
//!
//! Expired refresh tokens can no longer be used, but their rows stay until
//! swept. [`spawn_refresh_token_purge`] runs the sweep on a fixed interval
//! until the shutdown token is cancelled.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickr_api::housekeeping::spawn_refresh_token_purge;
//! # use tickr_shared::auth::tokens::TokenService;
//!
//! # async fn example(tokens: TokenService) {
//! let shutdown = CancellationToken::new();
//! let handle = spawn_refresh_token_purge(tokens, Duration::from_secs(3600), shutdown.clone());
//!
//! shutdown.cancel();
//! handle.await.ok();
//! # }
//! ```

use std::time::Duration;
use tickr_shared::auth::tokens::TokenService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Runs one sweep and logs the outcome. Errors are logged, not returned.
pub async fn purge_expired_refresh_tokens(tokens: &TokenService) -> u64 {
    match tokens.purge_expired().await {
        Ok(0) => 0,
        Ok(removed) => {
            tracing::info!(removed, "Purged expired refresh tokens");
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to purge expired refresh tokens");
            0
        }
    }
}

/// Spawns the periodic refresh token sweep
///
/// The first sweep runs immediately. The task exits once `shutdown` is
/// cancelled.
pub fn spawn_refresh_token_purge(
    tokens: TokenService,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Refresh token purge started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    purge_expired_refresh_tokens(&tokens).await;
                }
            }
        }

        tracing::info!("Refresh token purge stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockable::Clock;
    use std::sync::Arc;
    use tickr_shared::auth::jwt::AccessTokens;
    use tickr_shared::models::{CreateUser, Role};
    use tickr_shared::store::memory::InMemoryStore;
    use tickr_shared::store::UserRepository;
    use tickr_shared::test_support::MutableClock;

    async fn setup() -> (TokenService, InMemoryStore, Arc<MutableClock>) {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let clock_dyn: Arc<dyn Clock + Send + Sync> = clock.clone();
        let store = InMemoryStore::with_clock(clock_dyn.clone());
        let access = AccessTokens::new("housekeeping-test-secret-32-bytes!", clock_dyn.clone()).unwrap();
        let shared = Arc::new(store.clone());
        let tokens = TokenService::new(access, shared.clone(), shared, clock_dyn);

        let user = store
            .create(CreateUser {
                name: "Sweeper".to_string(),
                email: "sweeper@example.com".to_string(),
                password_hash: "unused".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        tokens.issue_pair(&user).await.unwrap();
        tokens.issue_pair(&user).await.unwrap();

        (tokens, store, clock)
    }

    #[tokio::test]
    async fn test_purge_keeps_active_tokens() {
        let (tokens, store, _clock) = setup().await;

        assert_eq!(purge_expired_refresh_tokens(&tokens).await, 0);
        assert_eq!(store.refresh_token_count().await, 2);
    }

    #[tokio::test]
    async fn test_purge_removes_expired_tokens() {
        let (tokens, store, clock) = setup().await;
        clock.advance(chrono::Duration::days(8));

        assert_eq!(purge_expired_refresh_tokens(&tokens).await, 2);
        assert_eq!(store.refresh_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_background_purge_stops_on_shutdown() {
        let (tokens, store, clock) = setup().await;
        clock.advance(chrono::Duration::days(8));

        let shutdown = CancellationToken::new();
        let handle = spawn_refresh_token_purge(tokens, Duration::from_millis(10), shutdown.clone());

        for _ in 0..100 {
            if store.refresh_token_count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.refresh_token_count().await, 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("purge task should stop")
            .unwrap();
    }
}
