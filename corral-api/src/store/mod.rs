//! Repository layer over the SQLite pool
//!
//! Handlers never touch sqlx directly; each resource gets a store with an
//! explicit lifecycle, injected through `AppState`, so state is testable
//! without process globals.

pub mod catalogue;
pub mod conversations;
pub mod leads;
pub mod tasks;
pub mod uploads;

pub use catalogue::CatalogueStore;
pub use conversations::{ConversationStore, MessageInput};
pub use leads::{LeadInput, LeadStore};
pub use tasks::{TaskInput, TaskStore};
pub use uploads::{NewUploadSession, UploadStore};
