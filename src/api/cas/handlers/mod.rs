pub mod logout;
pub mod proxy_callback;
