pub(crate) mod capture_thread;
pub mod controller;
pub mod engine;
