pub mod auth;
pub mod commands;
pub mod controller;
pub mod greeting;
pub mod logging;
pub mod models;
pub mod remote;
pub mod server;
pub mod shell;
pub mod state;
pub mod storage;
pub mod store;
