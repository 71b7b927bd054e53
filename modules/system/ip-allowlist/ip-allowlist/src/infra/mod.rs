//! Infrastructure layer: persistence.

pub mod storage;
