pub mod config;
pub mod context;
pub mod core;
pub mod db;
pub mod error;
pub mod identity;
pub mod invokers;
pub mod logging;
pub mod stores;
pub mod web;
