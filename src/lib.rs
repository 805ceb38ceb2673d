pub mod api;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod models;
pub mod page;
pub mod pastes;
pub mod storage;
