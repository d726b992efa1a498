//! Infrastructure adapters for the auth core.

pub mod directory;

pub use directory::accounts::PostgresAccountDirectory;
pub use directory::organizations::PostgresOrganizationDirectory;
pub use directory::{connect, ensure_schema};
