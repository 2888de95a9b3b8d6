pub mod confirmation_token;
pub mod note;
pub mod user;

pub use confirmation_token::ConfirmationToken;
pub use note::{DEFAULT_NOTE_COLOR, NOTE_COLORS, Note, NoteInput};
pub use user::User;
