//! Payment reconciliation for paid events
//!
//! An order is created with the gateway and recorded as `created`. The
//! gateway's callback is checked against the shared-secret signature before
//! anything is touched; only then is the payment completed and the
//! registration issued. Repeated callbacks are answered from stored state.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::database::store::Stores;
use crate::models::*;
use crate::services::auth::Identity;
use crate::services::events::ensure_visible;
use crate::services::gateway::{PaymentGateway, SignatureVerifier};
use crate::services::registration::RegistrationService;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::helpers::short_id;
use crate::utils::logging::{log_payment_event, log_security_rejection};

#[derive(Clone)]
pub struct PaymentService {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    verifier: SignatureVerifier,
    registrations: RegistrationService,
    key_id: String,
    currency: String,
}

impl PaymentService {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        registrations: RegistrationService,
        key_id: String,
        currency: String,
    ) -> Self {
        Self {
            stores,
            gateway,
            verifier,
            registrations,
            key_id,
            currency,
        }
    }

    /// Approved paid event the caller may see
    async fn payable_event(&self, identity: &Identity, event_id: Uuid) -> Result<Event> {
        identity.require_student()?;

        let event = self
            .stores
            .events
            .find_event(event_id)
            .await?
            .filter(|event| event.status == EventStatus::Approved)
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;

        if !event.is_paid || event.price <= 0 {
            return Err(ClubHubError::Validation(
                "event is free; register directly".to_string(),
            ));
        }
        ensure_visible(self.stores.clubs.as_ref(), &event, identity.user_id).await?;
        Ok(event)
    }

    /// `AlreadyCompleted` once the student has paid for or registered to the event
    async fn ensure_not_completed(&self, student_id: Uuid, event_id: Uuid) -> Result<()> {
        if self.stores.payments.find_paid(student_id, event_id).await?.is_some() {
            return Err(ClubHubError::AlreadyCompleted(
                "payment for this event is already completed".to_string(),
            ));
        }
        if self
            .stores
            .registrations
            .find_registration(event_id, student_id)
            .await?
            .is_some()
        {
            return Err(ClubHubError::AlreadyCompleted(
                "already registered for this event".to_string(),
            ));
        }
        Ok(())
    }

    /// Pre-payment lookup shown before opening the gateway checkout
    pub async fn checkout(&self, identity: &Identity, event_id: Uuid) -> Result<CheckoutSummary> {
        let event = self.payable_event(identity, event_id).await?;
        self.ensure_not_completed(identity.user_id, event_id).await?;

        Ok(CheckoutSummary {
            event_id,
            title: event.title,
            venue: event.venue,
            price: event.price,
            currency: self.currency.clone(),
        })
    }

    pub async fn create_order(&self, identity: &Identity, event_id: Uuid) -> Result<OrderSummary> {
        let event = self.payable_event(identity, event_id).await?;
        self.ensure_not_completed(identity.user_id, event_id).await?;
        self.registrations.ensure_open(&event, Utc::now().date_naive()).await?;

        let receipt = format!(
            "evt_{}_{}",
            short_id(event_id, 6),
            short_id(identity.user_id, 6)
        );
        let order = self
            .gateway
            .create_order(event.price, &self.currency, &receipt)
            .await?;

        let payment = self
            .stores
            .payments
            .insert_payment(NewPayment {
                student_id: identity.user_id,
                event_id,
                amount: event.price,
                currency: order.currency.clone(),
                gateway_order_id: order.id.clone(),
            })
            .await?;

        log_payment_event(&order.id, identity.user_id, event_id, "order_created");
        Ok(OrderSummary {
            payment_id: payment.id,
            order_id: order.id,
            amount: payment.amount,
            currency: payment.currency,
            key_id: self.key_id.clone(),
        })
    }

    /// Verify a gateway callback; safe to repeat
    pub async fn verify_payment(&self, identity: &Identity, request: VerifyPaymentRequest) -> Result<VerificationOutcome> {
        identity.require_student()?;

        if let Err(e) = self.verifier.verify(
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.gateway_signature,
        ) {
            log_security_rejection(
                "payment_signature",
                identity.user_id,
                Some(&request.gateway_order_id),
            );
            return Err(e);
        }

        let payment = self
            .stores
            .payments
            .find_by_order(&request.gateway_order_id, identity.user_id, request.event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("payment", &request.gateway_order_id))?;

        let (payment, already_verified) = if payment.status == PaymentStatus::Paid {
            (payment, true)
        } else {
            match self
                .stores
                .payments
                .complete_payment(
                    payment.id,
                    &request.gateway_payment_id,
                    &request.gateway_signature,
                    Utc::now(),
                )
                .await?
            {
                Some(paid) => {
                    log_payment_event(&paid.gateway_order_id, identity.user_id, paid.event_id, "paid");
                    (paid, false)
                }
                // A concurrent callback completed it first
                None => {
                    let paid = self
                        .stores
                        .payments
                        .find_by_order(&request.gateway_order_id, identity.user_id, request.event_id)
                        .await?
                        .ok_or_else(|| ClubHubError::not_found("payment", &request.gateway_order_id))?;
                    (paid, true)
                }
            }
        };

        if already_verified && payment.gateway_payment_id.as_deref() != Some(request.gateway_payment_id.as_str()) {
            log_security_rejection(
                "payment_id_mismatch",
                identity.user_id,
                Some(&format!(
                    "order {} recorded {:?}, callback carried {}",
                    payment.gateway_order_id, payment.gateway_payment_id, request.gateway_payment_id
                )),
            );
        }

        let registration = self.ensure_registration(payment.event_id, identity.user_id).await?;
        info!(
            payment_id = %payment.id,
            registration_id = %registration.id,
            already_verified = already_verified,
            "Payment verified"
        );

        Ok(VerificationOutcome {
            payment_id: payment.id,
            registration_id: registration.id,
            already_verified,
        })
    }

    /// Existing registration for the pair, or a freshly issued one
    async fn ensure_registration(&self, event_id: Uuid, student_id: Uuid) -> Result<Registration> {
        if let Some(existing) = self
            .stores
            .registrations
            .find_registration(event_id, student_id)
            .await?
        {
            return Ok(existing);
        }

        let event = self
            .stores
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;

        match self.registrations.issue(&event, student_id, None).await {
            Ok(registration) => Ok(registration),
            Err(ClubHubError::Conflict(_)) => self
                .stores
                .registrations
                .find_registration(event_id, student_id)
                .await?
                .ok_or_else(|| ClubHubError::not_found("registration", event_id)),
            Err(e) => Err(e),
        }
    }
}
