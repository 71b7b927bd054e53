pub mod error;
pub mod guards;
