//! Services backing the storefront handlers.
//!
//! - `backend` - HTTP client for the EventConnect backend API
//! - `flows` - In-memory verification flows and PDF hand-offs
//! - `pass` - Signed redemption passes linking pages to a flow

pub mod backend;
pub mod flows;
pub mod pass;

pub use backend::{BackendClient, BackendError};
pub use flows::{FlowStore, PdfDownload, PdfStore, SharedSession};
pub use pass::{PassError, PassSigner, RedemptionPass};
