pub mod account;
pub mod email;
pub mod password;
pub mod token;

pub use account::AccountService;
pub use email::{ConsoleMailer, EmailService, MailError, MailMessage, Mailer};
#[cfg(feature = "email")]
pub use email::SmtpMailer;
