//! Booking lifecycle tests
//!
//! These run the real `BookingService` against the in-memory store with a
//! stub invoice collaborator, covering the full create / pay / update /
//! cancel lifecycle and the consistency properties around stock, balance
//! and payment state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use chrono::{Duration, Utc};

use api::error::ApiError;
use api::middleware::CallerIdentity;
use api::models::{
    Booking, CreateBookingRequest, RegisterRequest, TopUpRequest, UpdateBookingRequest, User,
};
use api::notify::InvoiceNotifier;
use api::service::BookingService;
use api::store::BookingStore;
use api::store::memory::MemStore;

/// Invoice stub that counts how often it was called
#[derive(Clone, Default)]
struct RecordingInvoicer {
    calls: Arc<AtomicUsize>,
}

impl InvoiceNotifier for RecordingInvoicer {
    async fn invoice_created(
        &self,
        _customer: &User,
        _booking: &Booking,
        _room_name: &str,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Invoice stub that always fails
#[derive(Clone)]
struct FailingInvoicer;

impl InvoiceNotifier for FailingInvoicer {
    async fn invoice_created(
        &self,
        _customer: &User,
        _booking: &Booking,
        _room_name: &str,
    ) -> anyhow::Result<()> {
        Err(anyhow!("invoice provider unavailable"))
    }
}

type TestService = BookingService<MemStore, RecordingInvoicer>;

fn service(store: &MemStore) -> (TestService, RecordingInvoicer) {
    let invoicer = RecordingInvoicer::default();
    (
        BookingService::new(store.clone(), invoicer.clone()),
        invoicer,
    )
}

async fn register_caller(service: &TestService, email: &str) -> CallerIdentity {
    let user = service
        .register_user(RegisterRequest {
            name: "Ayu Lestari".to_string(),
            email: email.to_string(),
            password: "gardenia7pass".to_string(),
        })
        .await
        .expect("registration failed");
    CallerIdentity { user_id: user.id }
}

async fn top_up(service: &TestService, caller: CallerIdentity, amount: f64) {
    service
        .top_up(caller, TopUpRequest { amount })
        .await
        .expect("top-up failed");
}

fn book(room_id: i64, days: i64) -> CreateBookingRequest {
    CreateBookingRequest {
        room_id,
        start_date: Utc::now() + Duration::days(7),
        days,
    }
}

async fn only_booking_id(service: &TestService, caller: CallerIdentity) -> i64 {
    let bookings = service.my_bookings(caller).await.unwrap();
    assert_eq!(bookings.len(), 1);
    bookings[0].booking_id
}

async fn stock_of(store: &MemStore, room_id: i64) -> i32 {
    store.room(room_id).await.unwrap().unwrap().stock
}

async fn balance_of(service: &TestService, caller: CallerIdentity) -> f64 {
    service.profile(caller).await.unwrap().balance
}

#[tokio::test]
async fn full_lifecycle_create_pay_cancel() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 2).await;

    let (service, invoicer) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 500.0).await;

    let created = service.create_booking(caller, book(room, 3)).await.unwrap();
    assert_eq!(created.total_price, 300.0);
    assert_eq!(created.room_name, "Palm 201");
    assert_eq!(created.category, "Deluxe");
    assert_eq!(stock_of(&store, room).await, 1);

    let booking_id = only_booking_id(&service, caller).await;
    assert!(!service.my_bookings(caller).await.unwrap()[0].is_paid);

    let receipt = service.pay_booking(caller, booking_id).await.unwrap();
    assert_eq!(receipt.balance, 200.0);
    assert!(receipt.is_paid);
    assert_eq!(invoicer.calls.load(Ordering::SeqCst), 1);
    assert!(service.my_bookings(caller).await.unwrap()[0].is_paid);

    let notice = service.cancel_booking(caller, booking_id).await.unwrap();
    assert_eq!(notice.refund_amount, Some(300.0));
    assert_eq!(balance_of(&service, caller).await, 500.0);
    assert_eq!(stock_of(&store, room).await, 2);
    assert!(service.my_bookings(caller).await.unwrap().is_empty());
}

#[tokio::test]
async fn booking_a_full_room_conflicts_and_leaves_stock_unchanged() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 50.0).await;
    let room = store.add_room("Garden 101", standard, 0).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    let err = service.create_booking(caller, book(room, 2)).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(stock_of(&store, room).await, 0);
    assert!(service.my_bookings(caller).await.unwrap().is_empty());
}

#[tokio::test]
async fn booking_rejects_non_positive_day_counts() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 50.0).await;
    let room = store.add_room("Garden 101", standard, 3).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    for days in [0, -2] {
        let err = service
            .create_booking(caller, book(room, days))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
    assert_eq!(stock_of(&store, room).await, 3);
}

#[tokio::test]
async fn booking_an_unknown_room_is_not_found() {
    let store = MemStore::new();
    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    let err = service.create_booking(caller, book(99, 1)).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn paying_twice_debits_the_balance_exactly_once() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, invoicer) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 400.0).await;

    service.create_booking(caller, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    service.pay_booking(caller, booking_id).await.unwrap();
    let err = service.pay_booking(caller, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyPaid));

    assert_eq!(balance_of(&service, caller).await, 200.0);
    assert_eq!(invoicer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paying_beyond_the_balance_fails_and_leaves_it_unchanged() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, invoicer) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 150.0).await;

    service.create_booking(caller, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    let err = service.pay_booking(caller, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::InsufficientBalance));
    assert_eq!(balance_of(&service, caller).await, 150.0);
    assert!(!service.my_bookings(caller).await.unwrap()[0].is_paid);
    assert_eq!(invoicer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn paying_someone_elses_booking_reads_as_not_found() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let owner = register_caller(&service, "owner@example.com").await;
    let other = register_caller(&service, "other@example.com").await;
    top_up(&service, other, 500.0).await;

    service.create_booking(owner, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, owner).await;

    let err = service.pay_booking(other, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(balance_of(&service, other).await, 500.0);
}

#[tokio::test]
async fn invoice_failure_rolls_the_whole_payment_back() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 500.0).await;
    service.create_booking(caller, book(room, 3)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    let failing = BookingService::new(store.clone(), FailingInvoicer);
    let err = failing.pay_booking(caller, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal(_)));

    // Nothing of the aborted payment is visible
    assert_eq!(balance_of(&service, caller).await, 500.0);
    assert!(!service.my_bookings(caller).await.unwrap()[0].is_paid);

    // The booking is still payable once the collaborator recovers
    let receipt = service.pay_booking(caller, booking_id).await.unwrap();
    assert_eq!(receipt.balance, 200.0);
}

#[tokio::test]
async fn cancelling_an_unpaid_booking_restores_stock_without_refund() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 50.0).await;
    let room = store.add_room("Garden 101", standard, 5).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    service.create_booking(caller, book(room, 1)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;
    assert_eq!(stock_of(&store, room).await, 4);

    let notice = service.cancel_booking(caller, booking_id).await.unwrap();
    assert_eq!(notice.refund_amount, None);
    assert_eq!(stock_of(&store, room).await, 5);

    // A second cancel finds nothing to act on
    let err = service.cancel_booking(caller, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn cancelling_someone_elses_booking_is_forbidden() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 50.0).await;
    let room = store.add_room("Garden 101", standard, 1).await;

    let (service, _) = service(&store);
    let owner = register_caller(&service, "owner@example.com").await;
    let other = register_caller(&service, "other@example.com").await;

    service.create_booking(owner, book(room, 1)).await.unwrap();
    let booking_id = only_booking_id(&service, owner).await;

    let err = service.cancel_booking(other, booking_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    assert_eq!(stock_of(&store, room).await, 0);
}

#[tokio::test]
async fn updating_the_room_of_a_paid_booking_refunds_and_reprices() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 100.0).await;
    let deluxe = store.add_category("Deluxe", "", 150.0).await;
    let old_room = store.add_room("Garden 101", standard, 1).await;
    let new_room = store.add_room("Palm 201", deluxe, 2).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 500.0).await;

    service.create_booking(caller, book(old_room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;
    service.pay_booking(caller, booking_id).await.unwrap();
    assert_eq!(balance_of(&service, caller).await, 300.0);
    assert_eq!(stock_of(&store, old_room).await, 0);

    let updated = service
        .update_booking(
            caller,
            booking_id,
            UpdateBookingRequest {
                room_id: Some(new_room),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.refund_amount, Some(200.0));
    assert_eq!(updated.room_name, "Palm 201");
    // Two nights repriced at the new category's rate
    assert_eq!(updated.total_price, 300.0);

    assert_eq!(balance_of(&service, caller).await, 500.0);
    assert_eq!(stock_of(&store, old_room).await, 1);
    assert_eq!(stock_of(&store, new_room).await, 1);

    let bookings = service.my_bookings(caller).await.unwrap();
    assert_eq!(bookings[0].room_id, new_room);
    assert!(!bookings[0].is_paid);
}

#[tokio::test]
async fn updating_days_recomputes_dates_and_price() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    service.create_booking(caller, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    let updated = service
        .update_booking(
            caller,
            booking_id,
            UpdateBookingRequest {
                days: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.total_price, 500.0);
    assert_eq!(updated.refund_amount, None);

    let bookings = service.my_bookings(caller).await.unwrap();
    assert_eq!(
        (bookings[0].end_date - bookings[0].start_date).num_days(),
        5
    );
    assert_eq!(bookings[0].total_price, 500.0);
}

#[tokio::test]
async fn shifting_the_start_date_keeps_the_night_count() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    service.create_booking(caller, book(room, 3)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    let new_start = Utc::now() + Duration::days(30);
    service
        .update_booking(
            caller,
            booking_id,
            UpdateBookingRequest {
                start_date: Some(new_start),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let bookings = service.my_bookings(caller).await.unwrap();
    assert_eq!(bookings[0].start_date, new_start);
    assert_eq!(
        (bookings[0].end_date - bookings[0].start_date).num_days(),
        3
    );
    assert_eq!(bookings[0].total_price, 300.0);
}

#[tokio::test]
async fn update_rejects_non_positive_day_counts() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    service.create_booking(caller, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;

    let err = service
        .update_booking(
            caller,
            booking_id,
            UpdateBookingRequest {
                days: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn moving_to_a_full_room_fails_without_touching_anything() {
    let store = MemStore::new();
    let standard = store.add_category("Standard", "", 100.0).await;
    let deluxe = store.add_category("Deluxe", "", 150.0).await;
    let old_room = store.add_room("Garden 101", standard, 1).await;
    let full_room = store.add_room("Palm 201", deluxe, 0).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 500.0).await;

    service.create_booking(caller, book(old_room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;
    service.pay_booking(caller, booking_id).await.unwrap();

    let err = service
        .update_booking(
            caller,
            booking_id,
            UpdateBookingRequest {
                room_id: Some(full_room),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // The refund that ran before the conflict was rolled back with the rest
    assert_eq!(balance_of(&service, caller).await, 300.0);
    let bookings = service.my_bookings(caller).await.unwrap();
    assert!(bookings[0].is_paid);
    assert_eq!(bookings[0].room_id, old_room);
    assert_eq!(stock_of(&store, old_room).await, 0);
    assert_eq!(stock_of(&store, full_room).await, 0);
}

#[tokio::test]
async fn top_up_rejects_non_positive_amounts() {
    let store = MemStore::new();
    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;

    for amount in [0.0, -500.0] {
        let err = service
            .top_up(caller, TopUpRequest { amount })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
    assert_eq!(balance_of(&service, caller).await, 0.0);
}

#[tokio::test]
async fn history_lists_actions_newest_first() {
    let store = MemStore::new();
    let deluxe = store.add_category("Deluxe", "", 100.0).await;
    let room = store.add_room("Palm 201", deluxe, 1).await;

    let (service, _) = service(&store);
    let caller = register_caller(&service, "ayu@example.com").await;
    top_up(&service, caller, 500.0).await;
    service.create_booking(caller, book(room, 2)).await.unwrap();
    let booking_id = only_booking_id(&service, caller).await;
    service.pay_booking(caller, booking_id).await.unwrap();

    let history = service.history(caller).await.unwrap();
    let kinds: Vec<&str> = history.iter().map(|e| e.activity_type.as_str()).collect();
    assert_eq!(kinds, vec!["payment", "booking", "topup"]);
    assert!(history.iter().all(|e| e.user_id == caller.user_id));
}

#[tokio::test]
async fn registration_enforces_unique_emails_and_checks_credentials() {
    let store = MemStore::new();
    let (service, _) = service(&store);
    register_caller(&service, "ayu@example.com").await;

    let err = service
        .register_user(RegisterRequest {
            name: "Impostor".to_string(),
            email: "ayu@example.com".to_string(),
            password: "gardenia7pass".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    assert!(
        service
            .verify_credentials("ayu@example.com", "gardenia7pass")
            .await
            .is_ok()
    );
    let err = service
        .verify_credentials("ayu@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    let err = service
        .verify_credentials("nobody@example.com", "gardenia7pass")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}
