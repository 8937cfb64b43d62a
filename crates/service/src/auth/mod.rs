//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Login, token issuance and verification live here, independent of the web framework.

pub mod domain;
pub mod errors;
pub mod password;
pub mod repository;
pub mod service;
pub mod repo {
    #[cfg(feature = "seaorm")]
    pub mod seaorm;
}

pub use service::{AuthConfig, AuthService};
