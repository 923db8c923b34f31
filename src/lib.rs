pub mod api;
pub mod controller;
pub mod core;
pub mod notify;
pub mod poller;
pub mod prefs;
