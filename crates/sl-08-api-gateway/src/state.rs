//! Shared handler state.

use crate::domain::config::AuthConfig;
use sl_01_identity::IdentityService;
use sl_03_billing::BillingService;
use sl_04_payments::PaymentService;
use sl_05_document_forwarding::DocumentService;
use sl_06_agreements::AgreementService;
use sl_07_notifications::NotificationService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub billing: Arc<BillingService>,
    pub payments: Arc<PaymentService>,
    pub documents: Arc<DocumentService>,
    pub agreements: Arc<AgreementService>,
    pub notifications: Arc<NotificationService>,
    pub auth: Arc<AuthConfig>,
}
