pub mod me;
pub mod proxy_ticket;
