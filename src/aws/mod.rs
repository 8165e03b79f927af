use aws_smithy_types::DateTime;

pub mod credentials;
pub mod roles;
pub mod sts;

/// AWS temporary credentials returned by AssumeRoleWithSAML
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &"***")
            .field("expiration", &self.expiration)
            .finish()
    }
}

pub use credentials::ProfileStore;
pub use roles::IamRole;
pub use sts::{RoleAssumer, StsRoleAssumer};
