//! Application state shared across routes

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::game::{SessionHandle, SessionRegistry, SessionSettings};
use crate::weapons::catalog::WeaponCatalog;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    catalog: Arc<RwLock<Arc<WeaponCatalog>>>,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config, catalog: WeaponCatalog) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(RwLock::new(Arc::new(catalog))),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Catalog new sessions are built from; running sessions keep theirs
    pub fn catalog(&self) -> Arc<WeaponCatalog> {
        self.catalog.read().clone()
    }

    /// Re-read the catalog file, returns the number of weapons loaded
    pub fn reload_catalog(&self) -> Result<usize, ConfigError> {
        let catalog = match &self.config.weapon_catalog {
            Some(path) => WeaponCatalog::load(path)?,
            None => WeaponCatalog::builtin(),
        };
        let count = catalog.len();
        *self.catalog.write() = Arc::new(catalog);
        info!(weapons = count, "Weapon catalog reloaded");
        Ok(count)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::from_config(&self.config)
    }

    /// Pick the session a joining player goes to, starting one if needed
    pub fn session_for(&self, requested: Option<Uuid>) -> Option<SessionHandle> {
        match requested {
            Some(id) => self.registry.get(&id),
            None => Some(
                self.registry
                    .find_available(self.config.max_players)
                    .unwrap_or_else(|| self.registry.spawn(self.session_settings(), self.catalog())),
            ),
        }
    }
}
