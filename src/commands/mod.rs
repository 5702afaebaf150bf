pub mod create;
pub mod get;
pub mod migrate;
pub mod sweep;
