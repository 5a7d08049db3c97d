// Library exports shared by the server binary and integration tests
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;
