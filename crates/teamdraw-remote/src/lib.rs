// HTTP client for the account roster service.

pub mod client;

pub use client::HttpRosterService;
