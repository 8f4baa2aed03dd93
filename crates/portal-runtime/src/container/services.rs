//! # Service Container
//!
//! Holds every portal service with the storage and event bus they share.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: record store, blob store, clock, event bus
//! Level 1: Identity (also serves as the member Directory)
//! Level 2: Billing, Payments, DFS, Agreements, Notifications
//! ```
//!
//! Services never call each other; cross-cutting reactions (notifications,
//! metrics) run off the event bus.

use crate::container::config::{PortalConfig, StorageBackend};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{Directory, SystemTimeSource, TimeSource};
use sl_01_identity::{IdentityError, IdentityService, UserView};
use sl_02_record_store::{
    BlobError, BlobStore, DataDirLock, FsBlobStore, InMemoryBlobStore, InMemoryKVStore,
    KVStoreError, KeyValueStore, LockError,
};
use sl_03_billing::BillingService;
use sl_04_payments::PaymentService;
use sl_05_document_forwarding::DocumentService;
use sl_06_agreements::AgreementService;
use sl_07_notifications::NotificationService;
use sl_08_api_gateway::AppState;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Failures while opening storage.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Failed to open record store: {0}")]
    Records(#[from] KVStoreError),

    #[error("Failed to open file store: {0}")]
    Files(#[from] BlobError),

    #[error("Storage backend {0:?} is not compiled in (enable the `rocksdb` feature)")]
    BackendUnavailable(StorageBackend),
}

/// Central container holding all service instances.
pub struct PortalContainer {
    pub config: PortalConfig,
    pub bus: Arc<InMemoryEventBus>,
    pub identity: Arc<IdentityService>,
    pub billing: Arc<BillingService>,
    pub payments: Arc<PaymentService>,
    pub documents: Arc<DocumentService>,
    pub agreements: Arc<AgreementService>,
    pub notifications: Arc<NotificationService>,
    /// Held for the life of the process when storage is on disk.
    _data_lock: Option<DataDirLock>,
}

impl PortalContainer {
    /// Open the configured backend and build every service.
    #[instrument(skip_all, fields(backend = ?config.storage.backend))]
    pub fn open(config: PortalConfig) -> Result<Self, ContainerError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage; records are lost on exit");
                Ok(Self::in_memory(config))
            }
            StorageBackend::RocksDb => Self::open_on_disk(config),
        }
    }

    /// Fully in-memory container on the system clock.
    pub fn in_memory(config: PortalConfig) -> Self {
        Self::in_memory_with_clock(config, Arc::new(SystemTimeSource))
    }

    /// Fully in-memory container on a caller-supplied clock.
    pub fn in_memory_with_clock(config: PortalConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self::assemble(
            config,
            Arc::new(InMemoryKVStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            clock,
            None,
        )
    }

    #[cfg(feature = "rocksdb")]
    fn open_on_disk(config: PortalConfig) -> Result<Self, ContainerError> {
        use sl_02_record_store::{RocksDbConfig, RocksDbStore};

        let lock = DataDirLock::acquire(&config.storage.data_dir)?;

        let records = RocksDbStore::open(&RocksDbConfig {
            path: config.storage.records_dir(),
            ..RocksDbConfig::default()
        })?;
        let files = FsBlobStore::open(config.storage.files_dir())?;
        info!(
            data_dir = %config.storage.data_dir.display(),
            "Opened on-disk storage"
        );

        Ok(Self::assemble(
            config,
            Arc::new(records),
            Arc::new(files),
            Arc::new(SystemTimeSource),
            Some(lock),
        ))
    }

    #[cfg(not(feature = "rocksdb"))]
    fn open_on_disk(config: PortalConfig) -> Result<Self, ContainerError> {
        Err(ContainerError::BackendUnavailable(config.storage.backend))
    }

    /// In-memory records with files under `data_dir`, used where uploads
    /// must outlive the store in tests and tooling.
    pub fn with_file_store(config: PortalConfig) -> Result<Self, ContainerError> {
        let lock = DataDirLock::acquire(&config.storage.data_dir)?;
        let files = FsBlobStore::open(config.storage.files_dir())?;
        Ok(Self::assemble(
            config,
            Arc::new(InMemoryKVStore::new()),
            Arc::new(files),
            Arc::new(SystemTimeSource),
            Some(lock),
        ))
    }

    fn assemble(
        config: PortalConfig,
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn TimeSource>,
        data_lock: Option<DataDirLock>,
    ) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let events: Arc<dyn EventPublisher> = bus.clone();

        // Level 1
        let identity = Arc::new(IdentityService::new(
            kv.clone(),
            &config.identity_config(),
            clock.clone(),
            events.clone(),
        ));
        let directory: Arc<dyn Directory> = identity.clone();

        // Level 2
        let billing = Arc::new(BillingService::new(
            kv.clone(),
            blobs.clone(),
            clock.clone(),
            events.clone(),
        ));
        let payments = Arc::new(PaymentService::new(kv.clone(), clock.clone(), events.clone()));
        let documents = Arc::new(DocumentService::new(
            kv.clone(),
            blobs.clone(),
            directory.clone(),
            clock.clone(),
            events.clone(),
        ));
        let agreements = Arc::new(AgreementService::new(
            kv.clone(),
            blobs,
            directory.clone(),
            clock.clone(),
            events,
        ));
        let notifications = Arc::new(NotificationService::new(kv, directory, clock));

        info!("Portal services initialized");
        Self {
            config,
            bus,
            identity,
            billing,
            payments,
            documents,
            agreements,
            notifications,
            _data_lock: data_lock,
        }
    }

    /// Member lookup backed by the identity store.
    pub fn directory(&self) -> Arc<dyn Directory> {
        self.identity.clone()
    }

    /// Handler state for the gateway.
    pub fn app_state(&self) -> AppState {
        let gateway = self.config.gateway_config();
        AppState {
            identity: self.identity.clone(),
            billing: self.billing.clone(),
            payments: self.payments.clone(),
            documents: self.documents.clone(),
            agreements: self.agreements.clone(),
            notifications: self.notifications.clone(),
            auth: Arc::new(gateway.auth),
        }
    }

    /// Create the configured first admin if the store has none.
    pub fn bootstrap_admin(&self) -> Result<Option<UserView>, IdentityError> {
        let Some(admin) = &self.config.admin else {
            return Ok(None);
        };
        self.identity
            .bootstrap_admin(&admin.name, &admin.email, &admin.password)
    }
}
