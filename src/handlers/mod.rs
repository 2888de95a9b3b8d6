pub mod auth;
pub mod health;
pub mod home;
pub mod notes;
pub mod password_reset;
pub mod signin;
pub mod signout;
pub mod signup;

pub use auth::AuthUser;
pub use health::health_check;
pub use home::home;
pub use notes::{delete_note, edit_note, list_notes, new_note, save_note, view_note};
pub use password_reset::{
    forget_password, forget_password_form, reset_password, reset_password_form,
};
pub use signin::{signin, signin_form};
pub use signout::signout;
pub use signup::{confirm, signup, signup_form};
