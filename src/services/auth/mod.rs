pub mod factory;
pub mod guard;
pub mod identity;
pub mod password;
pub mod resolver;
pub mod service;
pub mod token_codec;

pub use factory::build_auth_service;
pub use guard::AuthorizationGuard;
pub use identity::{Identity, Role};
pub use service::{AuthService, Authentication};
