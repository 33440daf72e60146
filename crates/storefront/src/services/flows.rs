//! In-memory stores for open verification flows and pending PDF downloads.
//!
//! Both stores are `moka` caches, so entries disappear on their own once
//! they expire. A flow lives exactly as long as the pass that points at it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eventconnect_core::{RedemptionCode, VerificationSession};
use moka::future::Cache;
use uuid::Uuid;

/// How long a saved card's PDF waits to be fetched.
const PDF_TTL: Duration = Duration::from_secs(300);

const MAX_FLOWS: u64 = 10_000;
const MAX_PDFS: u64 = 1_000;

/// A verification session shared between concurrent requests of one flow.
///
/// The lock is only ever held for synchronous state changes.
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<VerificationSession>>);

impl SharedSession {
    fn new(session: VerificationSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Lock the session. A poisoned lock still yields the session; every
    /// transition leaves it consistent.
    pub fn lock(&self) -> MutexGuard<'_, VerificationSession> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the locked session.
    pub fn with<T>(&self, f: impl FnOnce(&mut VerificationSession) -> T) -> T {
        f(&mut self.lock())
    }
}

/// Open verification flows keyed by flow id.
#[derive(Clone)]
pub struct FlowStore {
    cache: Cache<Uuid, SharedSession>,
}

impl FlowStore {
    /// Create a store whose flows expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_FLOWS)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Open a flow for an accepted event code.
    pub async fn open(&self, code: RedemptionCode) -> Uuid {
        let id = Uuid::new_v4();
        self.cache
            .insert(id, SharedSession::new(VerificationSession::new(code)))
            .await;
        tracing::debug!(flow_id = %id, "Verification flow opened");
        id
    }

    /// The flow's session, if it is still open.
    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.cache.get(id).await
    }

    /// Close a flow. Its pass stops working immediately.
    pub async fn close(&self, id: &Uuid) {
        self.cache.invalidate(id).await;
        tracing::debug!(flow_id = %id, "Verification flow closed");
    }
}

/// A generated PDF waiting for the browser to fetch it.
#[derive(Debug)]
pub struct PdfDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One-shot hand-off of generated PDFs to the success page.
#[derive(Clone)]
pub struct PdfStore {
    cache: Cache<Uuid, Arc<PdfDownload>>,
}

impl Default for PdfStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfStore {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_PDFS)
            .time_to_live(PDF_TTL)
            .build();
        Self { cache }
    }

    /// Park a PDF and return the ticket that fetches it.
    pub async fn put(&self, download: PdfDownload) -> Uuid {
        let ticket = Uuid::new_v4();
        self.cache.insert(ticket, Arc::new(download)).await;
        ticket
    }

    /// Take a parked PDF. A ticket works once.
    pub async fn take(&self, ticket: &Uuid) -> Option<Arc<PdfDownload>> {
        self.cache.remove(ticket).await
    }
}
