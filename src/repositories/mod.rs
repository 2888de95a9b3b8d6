pub mod error;
#[cfg(test)]
pub mod memory;
pub mod note;
pub mod user;

pub use error::RepositoryError;
pub use note::{NoteRepository, PgNoteRepository};
pub use user::{PgUserRepository, UserRepository};
