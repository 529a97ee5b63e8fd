pub mod action;
pub mod context;
pub mod error;
pub mod event;
pub mod id;
pub mod ports;
pub mod schema;
