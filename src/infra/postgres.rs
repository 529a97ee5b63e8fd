pub mod audit_repo;
pub mod identity_repo;
