//! Shared handler state

use std::sync::Arc;

use battle_core::{CredibilityWeights, Feature};

use crate::auth::JwtValidator;
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::events::EventBus;

/// Everything a handler needs; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub jwt: JwtValidator,
    pub events: Arc<EventBus>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self, ApiError> {
        let jwt = config.jwt_validator()?;
        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            jwt,
            events: Arc::new(EventBus::new()),
        })
    }

    /// 403 when `feature` is switched off
    pub fn require(&self, feature: Feature) -> Result<(), ApiError> {
        if self.config.features.is_enabled(feature) {
            Ok(())
        } else {
            Err(ApiError::FeatureDisabled(feature))
        }
    }

    pub fn weights(&self) -> &CredibilityWeights {
        &self.config.economy.credibility
    }
}
