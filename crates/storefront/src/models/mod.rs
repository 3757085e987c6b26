//! Types the storefront keeps in the visitor's session.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentUser, keys as session_keys};
