mod principal;

pub use principal::{CasPrincipal, Principal};
