pub mod client;
pub mod config;
pub mod errors;
pub mod extract;
pub mod models;
pub mod recovery;
pub mod reducer;
pub mod report;
pub mod send;
pub mod stream;
pub mod sync;
