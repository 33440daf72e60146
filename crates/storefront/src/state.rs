//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{BackendClient, BackendError, FlowStore, PassSigner, PdfStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend client, the pass signer, and the in-memory flow stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    passes: PassSigner,
    flows: FlowStore,
    pdfs: PdfStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let passes = PassSigner::new(config.pass_secret.clone(), config.pass_ttl);
        let flows = FlowStore::new(config.pass_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                passes,
                flows,
                pdfs: PdfStore::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the redemption pass signer.
    #[must_use]
    pub fn passes(&self) -> &PassSigner {
        &self.inner.passes
    }

    /// Get a reference to the open verification flows.
    #[must_use]
    pub fn flows(&self) -> &FlowStore {
        &self.inner.flows
    }

    /// Get a reference to the pending PDF downloads.
    #[must_use]
    pub fn pdfs(&self) -> &PdfStore {
        &self.inner.pdfs
    }
}
