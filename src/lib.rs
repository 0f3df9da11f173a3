pub mod api;
pub mod config;
pub mod db;
pub mod desk;
pub mod events;
pub mod http;
pub mod queue;

pub use self::{config::Config, desk::Desk};
