/*
 * Responsibility
 * - Handler から見える「認証済み主体」の型
 * - gatekeeper が request extensions に格納し、handler はこの型だけを受け取る
 */
use std::sync::Arc;

use crate::services::cas::Receipt;

#[derive(Debug, Clone)]
pub struct CasPrincipal {
    receipt: Arc<Receipt>,
}

impl CasPrincipal {
    pub fn new(receipt: Arc<Receipt>) -> Self {
        Self { receipt }
    }

    pub fn username(&self) -> &str {
        self.receipt.username()
    }

    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }
}
