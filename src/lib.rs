pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod reminder;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
