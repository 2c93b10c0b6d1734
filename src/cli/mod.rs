pub mod auth;
pub mod connection;
pub mod list;
pub mod output;
pub mod sources;
pub mod sync;
