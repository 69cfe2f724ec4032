pub mod autosave;
pub mod editor;
pub mod handlers;
pub mod store;

pub use editor::SessionRegistry;
pub use store::PgDocumentStore;
