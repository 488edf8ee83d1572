/*
 * Responsibility
 * - Routes of the demo SMART app and the handlers behind them
 */
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::routes;
