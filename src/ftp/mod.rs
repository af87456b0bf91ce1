pub mod authenticator;
pub mod server;
pub mod storage_backend;
