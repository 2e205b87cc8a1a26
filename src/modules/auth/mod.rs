pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod tokens;
pub mod validation;

// Re-export the main types and functions
pub use error::{AuthError, Field};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, Profile};
pub use store::{CredentialBackend, CredentialStore, JsonFileBackend, MemoryBackend, StoreError, UserRecord};
pub use tokens::{SessionClaims, TokenService};
pub use validation::{validate_name, validate_password, validate_username};
