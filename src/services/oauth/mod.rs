pub mod core;
pub mod discovery;
pub mod pkce;
pub mod smart;
pub mod token;

pub use self::core::{CallbackParams, LaunchParams, OAuthCore, OAuthError};
pub use smart::SmartOAuth;
