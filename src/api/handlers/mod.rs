pub mod app;
pub mod flow;
pub mod health;
