pub mod postgres;
pub mod search;
