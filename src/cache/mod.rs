pub mod subscription;
pub mod token_store;
