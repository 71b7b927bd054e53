use std::sync::Arc;

use axum::Router;
use chrono::Duration;
use ip_allowlist_sdk::{AllowListError, AllowListStore};
use portal_security::Clock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::rest::middleware::IpGateState;
use crate::api::rest::routes;
use crate::config::IpAllowListConfig;
use crate::domain::{AllowListCache, AllowListService, AllowLogAggregator, IpAllowListGate};
use crate::infra::storage;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

/// Wires the store, cache, gate and management service from configuration.
pub struct IpAllowListModule {
    config: IpAllowListConfig,
    cache: Arc<AllowListCache>,
    logs: Arc<AllowLogAggregator>,
    gate: Arc<IpAllowListGate>,
    service: Arc<AllowListService>,
}

impl IpAllowListModule {
    /// Connect to the configured store and build the module.
    ///
    /// # Errors
    ///
    /// Returns [`AllowListError`] if the store cannot be opened or its schema created.
    pub async fn init(
        config: IpAllowListConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AllowListError> {
        info!("Initializing IP allow-list module");
        let store = storage::connect(&config.store).await?;
        Ok(Self::with_store(config, store, clock))
    }

    #[must_use]
    pub fn with_store(
        config: IpAllowListConfig,
        store: Arc<dyn AllowListStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(AllowListCache::new(
            store.clone(),
            clock.clone(),
            seconds(config.cache_ttl_secs),
        ));
        let logs = Arc::new(AllowLogAggregator::new(
            seconds(config.log_window_secs),
            seconds(config.log_retention_secs),
            clock,
        ));
        let gate = Arc::new(IpAllowListGate::new(
            config.enabled,
            config.bypass_paths.clone(),
            cache.clone(),
            logs.clone(),
        ));
        let service = Arc::new(AllowListService::new(store, cache.clone()));

        if !config.enabled {
            tracing::warn!("IP allow-list gate is disabled, all client addresses are admitted");
        }
        info!(
            cache_ttl_secs = config.cache_ttl_secs,
            bypass_paths = ?config.bypass_paths,
            trust_forwarded_for = config.trust_forwarded_for,
            "IP allow-list module initialized"
        );

        Self {
            config,
            cache,
            logs,
            gate,
            service,
        }
    }

    /// State for [`ip_allowlist_middleware`](crate::ip_allowlist_middleware).
    #[must_use]
    pub fn gate_state(&self) -> IpGateState {
        IpGateState::new(
            self.gate.clone(),
            self.config.trust_forwarded_for,
            &self.config.api_prefix,
        )
    }

    #[must_use]
    pub fn gate(&self) -> Arc<IpAllowListGate> {
        self.gate.clone()
    }

    #[must_use]
    pub fn service(&self) -> Arc<AllowListService> {
        self.service.clone()
    }

    #[must_use]
    pub fn cache(&self) -> Arc<AllowListCache> {
        self.cache.clone()
    }

    /// Management routes; mount behind the admin guard.
    #[must_use]
    pub fn management_router(&self) -> Router {
        routes::router(self.service.clone())
    }

    /// Periodically drop idle log-aggregation entries until `cancel` fires.
    #[must_use]
    pub fn spawn_log_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let logs = self.logs.clone();
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("allow-list log sweeper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = logs.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = logs.tracked_clients(), "swept idle allow-log entries");
                        }
                    }
                }
            }
        })
    }
}
