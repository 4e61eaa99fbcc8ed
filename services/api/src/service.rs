//! Booking orchestration
//!
//! [`BookingService`] owns every operation that touches room stock, user
//! balance and booking/payment state. Each mutating operation opens exactly
//! one unit of work, validates all preconditions before the first write,
//! performs its writes, appends one audit entry and commits; any early
//! return drops the unit of work and with it every write already made.

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{Duration, Utc};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CallerIdentity;
use crate::models::{
    ActivityEntry, ActivityKind, Booking, BookingCreated, BookingUpdated, BookingView,
    CancellationNotice, CreateBookingRequest, NewActivity, NewBooking, NewUser, PaymentReceipt,
    RegisterRequest, RoomRecord, RoomSummary, RoomView, TopUpReceipt, TopUpRequest,
    UpdateBookingRequest, User, UserProfile,
};
use crate::notify::InvoiceNotifier;
use crate::store::{BookingStore, UnitOfWork};

/// The booking service
///
/// Generic over its store and its invoice collaborator so the lifecycle
/// tests can run it against the in-memory store with a stub notifier.
#[derive(Clone)]
pub struct BookingService<S, N> {
    store: S,
    invoices: N,
}

impl<S: BookingStore, N: InvoiceNotifier> BookingService<S, N> {
    /// Create a new booking service over a store and an invoice collaborator
    pub fn new(store: S, invoices: N) -> Self {
        Self { store, invoices }
    }

    // --- queries ---

    /// All rooms with category, nightly price and remaining stock
    pub async fn list_rooms(&self) -> ApiResult<Vec<RoomSummary>> {
        Ok(self.store.rooms().await?)
    }

    /// A single room by id
    pub async fn room(&self, room_id: i64) -> ApiResult<RoomView> {
        self.store
            .room(room_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))
    }

    /// The caller's bookings, including payment status
    pub async fn my_bookings(&self, caller: CallerIdentity) -> ApiResult<Vec<BookingView>> {
        Ok(self.store.bookings_for_user(caller.user_id).await?)
    }

    /// The caller's audit trail, newest first
    pub async fn history(&self, caller: CallerIdentity) -> ApiResult<Vec<ActivityEntry>> {
        Ok(self.store.activity_for_user(caller.user_id).await?)
    }

    /// The caller's profile, including the current balance
    pub async fn profile(&self, caller: CallerIdentity) -> ApiResult<UserProfile> {
        let user = self
            .store
            .user(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(UserProfile::from(user))
    }

    // --- account ---

    /// Register a new user account
    pub async fn register_user(&self, req: RegisterRequest) -> ApiResult<User> {
        crate::validation::validate_name(&req.name).map_err(ApiError::InvalidInput)?;
        crate::validation::validate_email(&req.email).map_err(ApiError::InvalidInput)?;
        crate::validation::validate_password(&req.password).map_err(ApiError::InvalidInput)?;

        if self.store.user_by_email(&req.email).await?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .store
            .insert_user(NewUser {
                name: req.name,
                email: req.email,
                password_hash,
            })
            .await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check login credentials, returning the account on success
    pub async fn verify_credentials(&self, email: &str, password: &str) -> ApiResult<User> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !verify_password(&user.password_hash, password)? {
            return Err(ApiError::Unauthorized);
        }

        Ok(user)
    }

    // --- booking lifecycle ---

    /// Book a room for a number of nights
    ///
    /// Takes one unit from the room's stock and creates an unpaid booking
    /// priced at days x nightly category price.
    pub async fn create_booking(
        &self,
        caller: CallerIdentity,
        req: CreateBookingRequest,
    ) -> ApiResult<BookingCreated> {
        if req.days <= 0 {
            return Err(ApiError::InvalidInput(
                "Days must be greater than zero".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        let room = uow
            .room_for_update(req.room_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;
        if room.stock <= 0 {
            return Err(ApiError::Conflict("Room is fully booked".to_string()));
        }

        uow.set_room_stock(room.id, room.stock - 1).await?;

        let total_price = req.days as f64 * room.price;
        let booking = uow
            .insert_booking(NewBooking {
                user_id: caller.user_id,
                room_id: room.id,
                start_date: req.start_date,
                end_date: req.start_date + Duration::days(req.days),
                total_price,
            })
            .await?;

        uow.append_activity(NewActivity {
            user_id: caller.user_id,
            description: format!("Booked room {} for {} night(s)", room.name, req.days),
            activity_type: ActivityKind::Booking,
            reference_id: Some(booking.id),
        })
        .await?;

        uow.commit().await?;
        info!("User {} booked room {}", caller.user_id, room.id);

        Ok(BookingCreated {
            message: "Booking successful".to_string(),
            room_name: room.name,
            category: room.category_name,
            total_price,
        })
    }

    /// Pay an unpaid booking from the caller's balance
    ///
    /// Debits the balance, records the payment and notifies the invoice
    /// collaborator; if the collaborator fails, every write is rolled back
    /// and the booking stays unpaid.
    pub async fn pay_booking(
        &self,
        caller: CallerIdentity,
        booking_id: i64,
    ) -> ApiResult<PaymentReceipt> {
        let mut uow = self.store.begin().await?;

        let mut booking = uow
            .booking_for_update(booking_id)
            .await?
            .filter(|b| b.user_id == caller.user_id)
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

        let payment = uow.payment_for_booking(booking_id).await?;
        if booking.is_paid || payment.is_some_and(|p| p.paid_at.is_some()) {
            return Err(ApiError::AlreadyPaid);
        }

        let user = uow
            .user_for_update(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow!("user {} missing", caller.user_id)))?;
        if user.balance < booking.total_price {
            return Err(ApiError::InsufficientBalance);
        }

        let room = uow
            .room_for_update(booking.room_id)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow!("room {} missing", booking.room_id)))?;

        let new_balance = user.balance - booking.total_price;
        uow.set_balance(user.id, new_balance).await?;

        let paid_at = Utc::now();
        uow.upsert_payment(booking.id, booking.total_price, paid_at)
            .await?;

        booking.is_paid = true;
        uow.update_booking(&booking).await?;

        uow.append_activity(NewActivity {
            user_id: caller.user_id,
            description: format!("Payment for booking {}", booking.id),
            activity_type: ActivityKind::Payment,
            reference_id: Some(booking.id),
        })
        .await?;

        // The invoice collaborator is part of the consistency unit: if it
        // fails, the uncommitted unit of work is dropped and rolled back.
        self.invoices
            .invoice_created(&user, &booking, &room.name)
            .await
            .map_err(ApiError::Internal)?;

        uow.commit().await?;
        info!("User {} paid booking {}", caller.user_id, booking.id);

        Ok(PaymentReceipt {
            message: "Payment successful".to_string(),
            booking_id: booking.id,
            room_name: room.name,
            total_price: booking.total_price,
            balance: new_balance,
            is_paid: true,
            paid_at,
        })
    }

    /// Cancel a booking, refunding it first if it was paid
    pub async fn cancel_booking(
        &self,
        caller: CallerIdentity,
        booking_id: i64,
    ) -> ApiResult<CancellationNotice> {
        let mut uow = self.store.begin().await?;

        let booking = uow
            .booking_for_update(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;
        if booking.user_id != caller.user_id {
            return Err(ApiError::Forbidden(
                "You are not authorized to cancel this booking".to_string(),
            ));
        }

        let refund = if booking.is_paid {
            Some(self.reverse_payment(&mut uow, &booking).await?)
        } else {
            None
        };

        let room = uow
            .room_for_update(booking.room_id)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow!("room {} missing", booking.room_id)))?;

        uow.delete_booking(booking.id).await?;
        uow.set_room_stock(room.id, room.stock + 1).await?;

        let description = match refund {
            Some(amount) => format!(
                "Canceled booking for room {} (refunded {:.2})",
                room.name, amount
            ),
            None => format!("Canceled booking for room {}", room.name),
        };
        uow.append_activity(NewActivity {
            user_id: caller.user_id,
            description,
            activity_type: ActivityKind::Cancellation,
            reference_id: Some(booking.id),
        })
        .await?;

        uow.commit().await?;
        info!("User {} canceled booking {}", caller.user_id, booking.id);

        Ok(CancellationNotice {
            message: "Booking canceled successfully".to_string(),
            refund_amount: refund,
        })
    }

    /// Change a booking's room, duration or start date
    ///
    /// A paid booking is refunded first and must be paid again afterwards.
    /// The steps apply in a fixed order: refund, room change (with stock
    /// swap), duration, start-date shift.
    pub async fn update_booking(
        &self,
        caller: CallerIdentity,
        booking_id: i64,
        req: UpdateBookingRequest,
    ) -> ApiResult<BookingUpdated> {
        if req.days.is_some_and(|d| d <= 0) {
            return Err(ApiError::InvalidInput(
                "Days must be greater than zero".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        let mut booking = uow
            .booking_for_update(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;
        if booking.user_id != caller.user_id {
            return Err(ApiError::Forbidden(
                "You are not authorized to modify this booking".to_string(),
            ));
        }

        let refund = if booking.is_paid {
            let amount = self.reverse_payment(&mut uow, &booking).await?;
            booking.is_paid = false;
            Some(amount)
        } else {
            None
        };

        let room = match req.room_id {
            Some(new_room_id) if new_room_id != booking.room_id => {
                let (old_room, new_room) =
                    lock_room_pair(&mut uow, booking.room_id, new_room_id).await?;
                if new_room.stock <= 0 {
                    return Err(ApiError::Conflict("New room is fully booked".to_string()));
                }

                uow.set_room_stock(old_room.id, old_room.stock + 1).await?;
                uow.set_room_stock(new_room.id, new_room.stock - 1).await?;

                booking.room_id = new_room.id;
                // The price snapshot follows the room: reprice the current
                // number of nights at the new category's rate.
                booking.total_price = booking.nights() as f64 * new_room.price;
                new_room
            }
            _ => uow
                .room_for_update(booking.room_id)
                .await?
                .ok_or_else(|| ApiError::Internal(anyhow!("room {} missing", booking.room_id)))?,
        };

        if let Some(days) = req.days {
            booking.end_date = booking.start_date + Duration::days(days);
            booking.total_price = days as f64 * room.price;
        }

        if let Some(start_date) = req.start_date {
            let nights = booking.nights();
            booking.start_date = start_date;
            booking.end_date = start_date + Duration::days(nights);
        }

        uow.update_booking(&booking).await?;

        uow.append_activity(NewActivity {
            user_id: caller.user_id,
            description: format!("Updated booking for room {}", room.name),
            activity_type: ActivityKind::Update,
            reference_id: Some(booking.id),
        })
        .await?;

        uow.commit().await?;
        info!("User {} updated booking {}", caller.user_id, booking.id);

        Ok(BookingUpdated {
            message: "Booking successfully updated".to_string(),
            room_name: room.name,
            total_price: booking.total_price,
            refund_amount: refund,
        })
    }

    /// Credit the caller's balance
    pub async fn top_up(
        &self,
        caller: CallerIdentity,
        req: TopUpRequest,
    ) -> ApiResult<TopUpReceipt> {
        if req.amount <= 0.0 {
            return Err(ApiError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        let user = uow
            .user_for_update(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow!("user {} missing", caller.user_id)))?;

        let new_balance = user.balance + req.amount;
        uow.set_balance(user.id, new_balance).await?;

        let top_up = uow.insert_top_up(user.id, req.amount).await?;

        uow.append_activity(NewActivity {
            user_id: caller.user_id,
            description: format!("Top-up of {:.2}", req.amount),
            activity_type: ActivityKind::Topup,
            reference_id: Some(top_up.id),
        })
        .await?;

        uow.commit().await?;
        info!("User {} topped up {:.2}", caller.user_id, req.amount);

        Ok(TopUpReceipt {
            message: "Top-Up successful".to_string(),
            balance: new_balance,
        })
    }

    /// Undo the payment of a paid booking: credit the paid amount back and
    /// delete the payment record. Returns the refunded amount.
    async fn reverse_payment(&self, uow: &mut S::Uow, booking: &Booking) -> ApiResult<f64> {
        let payment = uow
            .payment_for_booking(booking.id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!("paid booking {} has no payment record", booking.id))
            })?;

        let user = uow
            .user_for_update(booking.user_id)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow!("user {} missing", booking.user_id)))?;

        uow.set_balance(user.id, user.balance + payment.amount)
            .await?;
        uow.delete_payment(booking.id).await?;

        Ok(payment.amount)
    }
}

/// Lock two room rows in ascending id order to keep concurrent room swaps
/// from deadlocking each other.
async fn lock_room_pair<U: UnitOfWork>(
    uow: &mut U,
    old_room_id: i64,
    new_room_id: i64,
) -> ApiResult<(RoomRecord, RoomRecord)> {
    let (first_id, second_id) = if old_room_id < new_room_id {
        (old_room_id, new_room_id)
    } else {
        (new_room_id, old_room_id)
    };

    let first = uow.room_for_update(first_id).await?;
    let second = uow.room_for_update(second_id).await?;

    let mut old_room = None;
    let mut new_room = None;
    for room in [first, second].into_iter().flatten() {
        if room.id == old_room_id {
            old_room = Some(room);
        } else if room.id == new_room_id {
            new_room = Some(room);
        }
    }

    let new_room =
        new_room.ok_or_else(|| ApiError::NotFound("New room not found".to_string()))?;
    let old_room = old_room
        .ok_or_else(|| ApiError::Internal(anyhow!("room {} missing", old_room_id)))?;

    Ok((old_room, new_room))
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("Failed to hash password: {}", e)))?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password_hash: &str, password: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(anyhow!("Failed to parse password hash: {}", e)))?;

    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("S3cure-pass").unwrap();
        assert!(verify_password(&hash, "S3cure-pass").unwrap());
        assert!(!verify_password(&hash, "wrong-pass").unwrap());
    }
}
