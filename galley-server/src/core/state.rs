//! Server state
//!
//! [`ServerState`] holds the shared handles every request handler
//! needs: configuration, the embedded database, the image store
//! gateway, the id source, and the expiry service. Cloning is shallow;
//! all heavy members sit behind `Arc` or are internally shared.

use std::path::PathBuf;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::error::AppError;

use crate::core::Config;
use crate::db::DbService;
use crate::services::{ExpiryService, ImageStorage, LocalImageStorage};
use crate::utils::{IdSource, UuidSource};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    /// Embedded database (SurrealDB)
    pub db: Surreal<Db>,
    /// Image store gateway
    pub image_storage: Arc<dyn ImageStorage>,
    /// Identifier source shared by repositories and services
    pub ids: Arc<dyn IdSource>,
    /// Expiry evaluation / cascade / sale recording
    pub expiry: ExpiryService,
}

impl ServerState {
    /// Initialize state for the production binary: create the work
    /// directory tree and open the on-disk database
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {}", e)))?;

        let db_service = DbService::new(&config.database_dir().join("galley.db")).await?;
        Ok(Self::with_db(config.clone(), db_service.db))
    }

    /// Build state around an already opened database
    ///
    /// Tests pair this with [`DbService::new_memory`] and a temp work
    /// directory.
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let ids: Arc<dyn IdSource> = Arc::new(UuidSource);
        let image_storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStorage::new(
            PathBuf::from(&config.work_dir),
            ids.clone(),
        ));
        let expiry = ExpiryService::new(
            db.clone(),
            ids.clone(),
            config.store_timeout(),
            config.cascade_on_consume,
        );

        Self {
            config,
            db,
            image_storage,
            ids,
            expiry,
        }
    }

    /// Get a database handle (shallow clone)
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
