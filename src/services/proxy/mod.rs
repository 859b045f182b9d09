pub mod chain;
pub mod pgt_store;

pub use chain::{ChainConfigError, ProxyChainAuthorizer};
pub use pgt_store::{ProxyGrantingTicket, ProxyGrantingTicketStore, ProxyTicket, RedeemError};
