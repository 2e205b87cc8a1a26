// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, config, http, utils};

// Re-export commonly used types
pub use modules::auth::error::{AuthError, Field};
pub use modules::auth::service::AuthService;
pub use modules::auth::store::{CredentialStore, UserRecord};
pub use modules::auth::tokens::{SessionClaims, TokenService};
pub use modules::config::AuthConfig;

// Constants
pub const USERS_FILE: &str = "users.json";
pub const TOKEN_DURATION: i64 = 3600;
pub const TOKEN_ALGORITHM: &str = "HS256";
pub const DEFAULT_PORT: u16 = 8000;
pub const STORE_IO_TIMEOUT_SECS: u64 = 5;

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
