//! Order placement, ticket issuance and door scanning.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::qr::QrSigner;
use crate::models::ticket::TICKET_ALREADY_SCANNED;
use crate::models::{NewOrder, NewTicket, Order, OrderWithTickets, Ticket, TicketValidation};
use crate::store::{OrderCancellation, Store};
use crate::utils::{AppError, AppResult};

pub const MAX_TICKETS_PER_ORDER: i32 = 10;

#[derive(Clone)]
pub struct TicketingService {
    store: Arc<dyn Store>,
    signer: QrSigner,
}

impl TicketingService {
    pub fn new(store: Arc<dyn Store>, signer: QrSigner) -> Self {
        Self { store, signer }
    }

    pub fn signer(&self) -> &QrSigner {
        &self.signer
    }

    /// Never fails for an unknown number; that is reported as `valid: false`.
    pub async fn validate(&self, ticket_number: &str) -> AppResult<TicketValidation> {
        let ticket = self.store.find_ticket_by_number(ticket_number).await?;
        Ok(TicketValidation::of(ticket.as_ref()))
    }

    /// Accepts either the ticket's UUID or its ticket number.
    async fn resolve(&self, identifier: &str) -> AppResult<Option<Ticket>> {
        match Uuid::parse_str(identifier) {
            Ok(id) => self.store.find_ticket(id).await,
            Err(_) => self.store.find_ticket_by_number(identifier).await,
        }
    }

    pub async fn scan(&self, identifier: &str, scanned_by: Uuid) -> AppResult<Ticket> {
        let ticket = self
            .resolve(identifier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket '{identifier}' not found")))?;

        let validation = TicketValidation::of(Some(&ticket));
        if let Some(reason) = validation.error {
            warn!(ticket_number = %ticket.ticket_number, %reason, "Scan rejected");
            return Err(AppError::Conflict(reason));
        }

        match self
            .store
            .mark_ticket_scanned(ticket.id, scanned_by, Utc::now())
            .await?
        {
            Some(scanned) => {
                info!(
                    ticket_number = %scanned.ticket_number,
                    %scanned_by,
                    "Ticket scanned"
                );
                Ok(scanned)
            }
            None => {
                let reason = self.rejection_after_race(ticket.id).await?;
                warn!(ticket_number = %ticket.ticket_number, %reason, "Lost scan race");
                Err(AppError::Conflict(reason))
            }
        }
    }

    /// Someone else moved the ticket out of `issued` first; describe its new state.
    async fn rejection_after_race(&self, ticket_id: Uuid) -> AppResult<String> {
        let current = self.store.find_ticket(ticket_id).await?;
        Ok(TicketValidation::of(current.as_ref())
            .error
            .unwrap_or_else(|| TICKET_ALREADY_SCANNED.to_string()))
    }

    pub async fn scan_qr(&self, payload: &str, scanned_by: Uuid) -> AppResult<Ticket> {
        let claims = self
            .signer
            .verify(payload)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        self.scan(&claims.ticket_number, scanned_by).await
    }

    pub async fn place_order(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderWithTickets> {
        if !(1..=MAX_TICKETS_PER_ORDER).contains(&quantity) {
            return Err(AppError::ValidationError(format!(
                "quantity must be between 1 and {MAX_TICKETS_PER_ORDER}"
            )));
        }

        let showtime = self
            .store
            .find_showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Showtime '{showtime_id}' not found")))?;

        let order_number = Order::generate_number(Utc::now());
        let tickets: Vec<NewTicket> = (0..quantity)
            .map(|_| {
                let ticket_number = Ticket::generate_number();
                NewTicket {
                    id: Uuid::new_v4(),
                    qr_payload: self.signer.sign(&ticket_number, &order_number),
                    ticket_number,
                }
            })
            .collect();

        let order = NewOrder {
            id: Uuid::new_v4(),
            order_number,
            user_id,
            showtime_id,
            quantity,
            total_amount: showtime.price * Decimal::from(quantity),
            currency: showtime.currency,
        };

        let placed = self.store.create_order(order, tickets).await?;
        info!(
            order_number = %placed.order.order_number,
            %user_id,
            quantity,
            "Order placed"
        );
        Ok(placed)
    }

    /// QR payloads are only returned to the purchaser.
    pub async fn get_order(
        &self,
        order_number: &str,
        viewer: Option<Uuid>,
    ) -> AppResult<OrderWithTickets> {
        let order = self
            .store
            .find_order_by_number(order_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order '{order_number}' not found")))?;
        let tickets = self.store.tickets_for_order(order.id).await?;
        let mut found = OrderWithTickets { order, tickets };
        if viewer != Some(found.order.user_id) {
            found.redact_qr_payloads();
        }
        Ok(found)
    }

    /// Only the purchaser may cancel.
    pub async fn cancel_order(
        &self,
        order_number: &str,
        caller: Uuid,
    ) -> AppResult<OrderWithTickets> {
        let order = self
            .store
            .find_order_by_number(order_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order '{order_number}' not found")))?;
        if order.user_id != caller {
            return Err(AppError::Forbidden(
                "Only the purchaser can cancel this order".to_string(),
            ));
        }

        match self.store.cancel_order(order.id).await? {
            OrderCancellation::Cancelled(cancelled) => {
                info!(%order_number, "Order cancelled");
                Ok(cancelled)
            }
            OrderCancellation::NotFound => Err(AppError::NotFound(format!(
                "Order '{order_number}' not found"
            ))),
            OrderCancellation::AlreadyCancelled => Err(AppError::Conflict(
                "Order is already cancelled".to_string(),
            )),
            OrderCancellation::HasScannedTickets => Err(AppError::Conflict(
                "Order has scanned tickets and cannot be cancelled".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{TICKET_CANCELLED, TICKET_NOT_FOUND};
    use crate::models::TicketStatus;
    use crate::seed;
    use crate::store::MemoryStore;

    async fn service() -> (TicketingService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        seed::run(&*store).await.unwrap();
        let work = store.featured_works().await.unwrap().remove(0);
        let showtime = store.showtimes_for_work(work.id).await.unwrap().remove(0);
        (
            TicketingService::new(store, QrSigner::new("test-qr-secret")),
            showtime.id,
        )
    }

    #[tokio::test]
    async fn test_placed_tickets_carry_verifiable_qr_payloads() {
        let (svc, showtime_id) = service().await;
        let placed = svc.place_order(Uuid::new_v4(), showtime_id, 2).await.unwrap();

        assert_eq!(placed.tickets.len(), 2);
        for ticket in &placed.tickets {
            assert!(!ticket.qr_payload.is_empty());
            let claims = svc.signer().verify(&ticket.qr_payload).unwrap();
            assert_eq!(claims.ticket_number, ticket.ticket_number);
            assert_eq!(claims.order_number, placed.order.order_number);
        }
        assert_eq!(placed.order.total_amount, Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn test_quantity_bounds() {
        let (svc, showtime_id) = service().await;
        for quantity in [0, MAX_TICKETS_PER_ORDER + 1] {
            let err = svc
                .place_order(Uuid::new_v4(), showtime_id, quantity)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_showtime_is_not_found() {
        let (svc, _) = service().await;
        let err = svc
            .place_order(Uuid::new_v4(), Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validate_unknown_ticket() {
        let (svc, _) = service().await;
        let result = svc.validate("TKT-0000000000").await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some(TICKET_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_second_scan_is_rejected() {
        let (svc, showtime_id) = service().await;
        let placed = svc.place_order(Uuid::new_v4(), showtime_id, 1).await.unwrap();
        let ticket = &placed.tickets[0];
        let admin = Uuid::new_v4();

        let scanned = svc.scan(&ticket.ticket_number, admin).await.unwrap();
        assert_eq!(scanned.status, TicketStatus::Scanned);
        assert_eq!(scanned.scanned_by, Some(admin));

        // Same ticket addressed by its id this time.
        let err = svc.scan(&ticket.id.to_string(), admin).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == TICKET_ALREADY_SCANNED));

        let validation = svc.validate(&ticket.ticket_number).await.unwrap();
        assert!(!validation.valid);
    }

    #[tokio::test]
    async fn test_concurrent_scans_admit_exactly_one() {
        let (svc, showtime_id) = service().await;
        let placed = svc.place_order(Uuid::new_v4(), showtime_id, 1).await.unwrap();
        let number = placed.tickets[0].ticket_number.clone();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                let number = number.clone();
                tokio::spawn(async move { svc.scan(&number, Uuid::new_v4()).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_race_rejection_reports_current_state() {
        let (svc, showtime_id) = service().await;
        let buyer = Uuid::new_v4();
        let placed = svc.place_order(buyer, showtime_id, 2).await.unwrap();
        let scanned = &placed.tickets[0];
        svc.scan(&scanned.ticket_number, Uuid::new_v4()).await.unwrap();
        assert_eq!(
            svc.rejection_after_race(scanned.id).await.unwrap(),
            TICKET_ALREADY_SCANNED
        );

        let other = svc.place_order(buyer, showtime_id, 1).await.unwrap();
        svc.cancel_order(&other.order.order_number, buyer).await.unwrap();
        assert_eq!(
            svc.rejection_after_race(other.tickets[0].id).await.unwrap(),
            TICKET_CANCELLED
        );
    }

    #[tokio::test]
    async fn test_scan_qr_checks_signature() {
        let (svc, showtime_id) = service().await;
        let placed = svc.place_order(Uuid::new_v4(), showtime_id, 1).await.unwrap();

        let forged = QrSigner::new("someone-else").sign(&placed.tickets[0].ticket_number, "ORD-X");
        let err = svc.scan_qr(&forged, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let scanned = svc
            .scan_qr(&placed.tickets[0].qr_payload, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(scanned.id, placed.tickets[0].id);
    }

    #[tokio::test]
    async fn test_cancel_order_rules() {
        let (svc, showtime_id) = service().await;
        let buyer = Uuid::new_v4();
        let placed = svc.place_order(buyer, showtime_id, 2).await.unwrap();
        let number = placed.order.order_number.clone();

        let err = svc.cancel_order(&number, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let cancelled = svc.cancel_order(&number, buyer).await.unwrap();
        assert!(cancelled
            .tickets
            .iter()
            .all(|t| t.status == TicketStatus::Cancelled));

        let err = svc.cancel_order(&number, buyer).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = svc
            .scan(&cancelled.tickets[0].ticket_number, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == TICKET_CANCELLED));
    }
}
