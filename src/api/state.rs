use std::sync::Arc;

use crate::aps::{Authenticator, DerivativeService, ObjectStorage};
use crate::auth::CredentialCache;
use crate::config::Config;
use crate::observability::Metrics;
use crate::storage::ObjectGateway;
use crate::translation::TranslationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialCache>,
    pub gateway: Arc<ObjectGateway>,
    pub translations: Arc<TranslationService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire every service against one platform implementation
    pub fn new<P>(config: Config, platform: Arc<P>) -> Self
    where
        P: Authenticator + ObjectStorage + DerivativeService + 'static,
    {
        let metrics = Arc::new(Metrics::new());
        let credentials = Arc::new(CredentialCache::new(
            platform.clone(),
            config.aps.refresh_margin(),
            metrics.clone(),
        ));
        let gateway = ObjectGateway::new(
            platform.clone(),
            credentials.clone(),
            config.gateway_settings(),
            metrics.clone(),
        );
        let translations = TranslationService::new(
            platform,
            credentials.clone(),
            config.translation_settings(),
            metrics.clone(),
        );

        Self {
            config: Arc::new(config),
            credentials,
            gateway: Arc::new(gateway),
            translations: Arc::new(translations),
            metrics,
        }
    }
}
