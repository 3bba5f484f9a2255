pub mod agent;
pub mod context;
pub mod health;
