//! Entity models persisted by the broker.

pub mod local_account;
pub mod role_binding;
pub mod sso_provider;

pub use local_account::{AccountType, LocalAccount, NewLocalAccount, FEDERATED_CREDENTIAL};
pub use role_binding::{NewRoleBinding, RoleBinding, DEFAULT_ROLE};
pub use sso_provider::{ProviderSettings, SsoProtocol, SsoProvider};
