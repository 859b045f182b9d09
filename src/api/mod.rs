pub mod cas;
pub mod v1;
