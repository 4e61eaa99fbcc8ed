//! In-memory implementation of the booking store
//!
//! Backs the lifecycle tests and local experiments. A unit of work takes
//! the state mutex for its whole duration and mutates a draft copy; commit
//! writes the draft back, dropping the value discards it. Holding the lock
//! across the unit of work gives the same serialization the PostgreSQL
//! implementation gets from row locks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    ActivityEntry, Booking, BookingView, Category, NewActivity, NewBooking, NewUser, Payment,
    Room, RoomRecord, RoomSummary, RoomView, TopUp, User,
};
use crate::store::{BookingStore, StoreResult, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemState {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    rooms: BTreeMap<i64, Room>,
    bookings: BTreeMap<i64, Booking>,
    payments: BTreeMap<i64, Payment>,
    top_ups: BTreeMap<i64, TopUp>,
    activity: Vec<ActivityEntry>,
    last_id: i64,
}

impl MemState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn room_record(&self, room: &Room) -> Option<RoomRecord> {
        let category = self.categories.get(&room.category_id)?;
        Some(RoomRecord {
            id: room.id,
            name: room.name.clone(),
            category_id: category.id,
            category_name: category.name.clone(),
            price: category.price,
            stock: room.stock,
        })
    }
}

/// Booking store held entirely in process memory
#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room category, returning its id
    ///
    /// Mirrors the reference data the SQL migrations seed in PostgreSQL.
    pub async fn add_category(&self, name: &str, description: &str, price: f64) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.categories.insert(
            id,
            Category {
                id,
                name: name.to_string(),
                description: description.to_string(),
                price,
            },
        );
        id
    }

    /// Seed a room with an initial stock, returning its id
    pub async fn add_room(&self, name: &str, category_id: i64, stock: i32) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.rooms.insert(
            id,
            Room {
                id,
                name: name.to_string(),
                category_id,
                stock,
            },
        );
        id
    }
}

impl BookingStore for MemStore {
    type Uow = MemUnitOfWork;

    async fn begin(&self) -> StoreResult<MemUnitOfWork> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let draft = guard.clone();
        Ok(MemUnitOfWork { guard, draft })
    }

    async fn rooms(&self) -> StoreResult<Vec<RoomSummary>> {
        let state = self.state.lock().await;
        let rooms = state
            .rooms
            .values()
            .filter_map(|room| {
                let category = state.categories.get(&room.category_id)?;
                Some(RoomSummary {
                    name: room.name.clone(),
                    category: category.name.clone(),
                    price: category.price,
                    stock: room.stock,
                })
            })
            .collect();
        Ok(rooms)
    }

    async fn room(&self, room_id: i64) -> StoreResult<Option<RoomView>> {
        let state = self.state.lock().await;
        let view = state.rooms.get(&room_id).and_then(|room| {
            let category = state.categories.get(&room.category_id)?;
            Some(RoomView {
                id: room.id,
                name: room.name.clone(),
                category: category.name.clone(),
                price: category.price,
                stock: room.stock,
            })
        });
        Ok(view)
    }

    async fn user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            balance: 0.0,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingView>> {
        let state = self.state.lock().await;
        let bookings = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| {
                let room = state.rooms.get(&b.room_id)?;
                let category = state.categories.get(&room.category_id)?;
                Some(BookingView {
                    booking_id: b.id,
                    room_id: room.id,
                    room_name: room.name.clone(),
                    category: category.name.clone(),
                    price: category.price,
                    start_date: b.start_date,
                    end_date: b.end_date,
                    total_price: b.total_price,
                    is_paid: b.is_paid,
                })
            })
            .collect();
        Ok(bookings)
    }

    async fn activity_for_user(&self, user_id: i64) -> StoreResult<Vec<ActivityEntry>> {
        let state = self.state.lock().await;
        // Entries are appended in order, so newest-first is a reverse scan
        let entries = state
            .activity
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(entries)
    }
}

/// Unit of work over a draft copy of the in-memory state
pub struct MemUnitOfWork {
    guard: OwnedMutexGuard<MemState>,
    draft: MemState,
}

impl UnitOfWork for MemUnitOfWork {
    async fn user_for_update(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.draft.users.get(&user_id).cloned())
    }

    async fn set_balance(&mut self, user_id: i64, balance: f64) -> StoreResult<()> {
        if let Some(user) = self.draft.users.get_mut(&user_id) {
            user.balance = balance;
        }
        Ok(())
    }

    async fn room_for_update(&mut self, room_id: i64) -> StoreResult<Option<RoomRecord>> {
        Ok(self
            .draft
            .rooms
            .get(&room_id)
            .and_then(|room| self.draft.room_record(room)))
    }

    async fn set_room_stock(&mut self, room_id: i64, stock: i32) -> StoreResult<()> {
        if let Some(room) = self.draft.rooms.get_mut(&room_id) {
            room.stock = stock;
        }
        Ok(())
    }

    async fn booking_for_update(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.draft.bookings.get(&booking_id).cloned())
    }

    async fn insert_booking(&mut self, new_booking: NewBooking) -> StoreResult<Booking> {
        let id = self.draft.next_id();
        let booking = Booking {
            id,
            user_id: new_booking.user_id,
            room_id: new_booking.room_id,
            start_date: new_booking.start_date,
            end_date: new_booking.end_date,
            total_price: new_booking.total_price,
            is_paid: false,
            created_at: Utc::now(),
        };
        self.draft.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if let Some(stored) = self.draft.bookings.get_mut(&booking.id) {
            *stored = booking.clone();
        }
        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: i64) -> StoreResult<()> {
        self.draft.bookings.remove(&booking_id);
        Ok(())
    }

    async fn payment_for_booking(&mut self, booking_id: i64) -> StoreResult<Option<Payment>> {
        Ok(self
            .draft
            .payments
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn upsert_payment(
        &mut self,
        booking_id: i64,
        amount: f64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Payment> {
        if let Some(payment) = self
            .draft
            .payments
            .values_mut()
            .find(|p| p.booking_id == booking_id)
        {
            payment.amount = amount;
            payment.paid_at = Some(paid_at);
            return Ok(payment.clone());
        }

        let id = self.draft.next_id();
        let payment = Payment {
            id,
            booking_id,
            amount,
            paid_at: Some(paid_at),
            created_at: Utc::now(),
        };
        self.draft.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn delete_payment(&mut self, booking_id: i64) -> StoreResult<()> {
        self.draft.payments.retain(|_, p| p.booking_id != booking_id);
        Ok(())
    }

    async fn insert_top_up(&mut self, user_id: i64, amount: f64) -> StoreResult<TopUp> {
        let id = self.draft.next_id();
        let top_up = TopUp {
            id,
            user_id,
            amount,
            created_at: Utc::now(),
        };
        self.draft.top_ups.insert(id, top_up.clone());
        Ok(top_up)
    }

    async fn append_activity(&mut self, entry: NewActivity) -> StoreResult<()> {
        let id = self.draft.next_id();
        self.draft.activity.push(ActivityEntry {
            id,
            user_id: entry.user_id,
            description: entry.description,
            activity_type: entry.activity_type,
            reference_id: entry.reference_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = self.draft;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;

    #[tokio::test]
    async fn dropping_a_unit_of_work_discards_its_writes() {
        let store = MemStore::new();
        let category = store.add_category("Standard", "", 50.0).await;
        let room = store.add_room("Garden 101", category, 3).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.set_room_stock(room, 0).await.unwrap();
            // No commit: the draft is discarded here
        }

        let view = store.room(room).await.unwrap().unwrap();
        assert_eq!(view.stock, 3);
    }

    #[tokio::test]
    async fn committed_writes_become_visible_together() {
        let store = MemStore::new();
        let category = store.add_category("Deluxe", "", 100.0).await;
        let room = store.add_room("Palm 201", category, 2).await;
        let user = store
            .insert_user(NewUser {
                name: "Ayu".to_string(),
                email: "ayu@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.set_room_stock(room, 1).await.unwrap();
        uow.set_balance(user.id, 250.0).await.unwrap();
        uow.append_activity(NewActivity {
            user_id: user.id,
            description: "Top-up of 250.00".to_string(),
            activity_type: ActivityKind::Topup,
            reference_id: None,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.room(room).await.unwrap().unwrap().stock, 1);
        assert_eq!(store.user(user.id).await.unwrap().unwrap().balance, 250.0);
        assert_eq!(store.activity_for_user(user.id).await.unwrap().len(), 1);
    }
}
