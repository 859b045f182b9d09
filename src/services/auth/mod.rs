pub mod factory;
pub mod outcome;
pub mod policy;

pub use factory::build_gate;
pub use outcome::{
    AuthState, AuthenticationGate, AuthenticationOutcome, Decision, GateRequest, Rejection,
    SessionUpdate,
};
pub use policy::{Strictness, StrictnessFailure};
