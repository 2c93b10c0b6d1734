pub mod authorize;
pub mod callback;
pub mod manager;
pub mod token;

pub use authorize::{AuthorizationRequest, Authorizer};
pub use callback::{listen_for_callback, CallbackParams};
pub use manager::{CredentialState, TokenManager};
pub use token::{exchange_grant, Grant, TokenResponse};
