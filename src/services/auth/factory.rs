/// Factory: build the `AuthenticationGate` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::outcome::AuthenticationGate;
use crate::services::auth::policy::Strictness;
use crate::services::cas::TicketValidator;

pub fn build_gate(config: &Config, validator: Arc<dyn TicketValidator>) -> Arc<AuthenticationGate> {
    let strictness = Strictness {
        require_renew: config.renew,
        authorized_chains: config.authorized_proxy_chains.clone().map(Arc::new),
    };

    let gate = AuthenticationGate::new(
        validator,
        strictness,
        config.validate_url.clone(),
        config.http_timeout,
    )
    .with_gateway(config.gateway)
    .with_proxy_callback(config.proxy_callback_url.clone());

    Arc::new(gate)
}
