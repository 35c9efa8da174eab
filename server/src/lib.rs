pub mod cron;
pub mod errors;
pub mod routes;
pub mod server;
pub mod session;
pub mod setup;
pub mod spotify;
pub mod state;
