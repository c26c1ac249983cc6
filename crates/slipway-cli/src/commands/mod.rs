pub mod app;
pub mod context;
pub mod init;
pub mod inspect;
