pub mod backoff;
pub mod config;
pub mod db;
pub mod state;
pub mod transfers;
