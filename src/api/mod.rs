pub mod chat;
pub mod health;
pub mod plan;
pub mod session;
pub mod upload;
