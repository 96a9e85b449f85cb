// Library root: roster model, draw engine, persistence and session handling
// shared by the remote service client and the console app.

pub mod config;
pub mod controller;
pub mod db;
pub mod draw;
pub mod error;
pub mod persistence;
pub mod player;
pub mod session;
pub mod store;
