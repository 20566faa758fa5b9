//! Request-level orchestration: the conversational agent and the trip planner.

pub mod chat;
pub mod planner;
