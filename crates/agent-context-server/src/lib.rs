pub mod config;
pub mod database;
pub mod handlers;
pub mod identity;
pub mod memory;
pub mod models;
pub mod router;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;
