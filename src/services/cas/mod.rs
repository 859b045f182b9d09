pub mod receipt;
pub mod response;
pub mod service;
pub mod validator;
pub mod xml;

pub use receipt::{Receipt, ReceiptError, ReceiptParts, ReceiptViolation};
pub use service::ServiceIdentity;
pub use validator::{TicketValidationClient, TicketValidator, ValidationError, ValidationRequest};
