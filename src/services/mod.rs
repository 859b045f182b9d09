pub mod auth;
pub mod cache;
pub mod cas;
pub mod echo;
pub mod http;
pub mod proxy;
pub mod session;
