pub mod audit_service;
pub mod enrichment;
pub mod index_retry;
pub mod permission;
pub mod unit_of_work;
