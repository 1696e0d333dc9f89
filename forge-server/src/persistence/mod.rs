// Vibeforge Persistence Layer
//
// Application records and their version history, stored as typed documents
// in a key-document store (PostgreSQL, a JSON snapshot file, or memory).

mod error;
mod manager;
mod models;
mod postgres;
mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use manager::RecordStore;
pub use models::{Document, DocumentKind};
pub use postgres::PgStore;
pub use store::{DocumentStore, JsonFileStore, MemoryStore};
