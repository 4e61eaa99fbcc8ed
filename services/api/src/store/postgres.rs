//! PostgreSQL implementation of the booking store
//!
//! One [`sqlx::Transaction`] backs each unit of work; dropping it without
//! commit rolls the transaction back. Locking reads use `FOR UPDATE` so two
//! operations mutating the same room stock or user balance serialize.

use sqlx::{PgPool, Postgres, Row, Transaction};
use sqlx::postgres::PgRow;

use chrono::{DateTime, Utc};

use crate::models::{
    ActivityEntry, Booking, BookingView, NewActivity, NewBooking, NewUser, Payment, RoomRecord,
    RoomSummary, RoomView, TopUp, User,
};
use crate::store::{BookingStore, StoreError, StoreResult, UnitOfWork};

/// Booking store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        balance: row.get("balance"),
        created_at: row.get("created_at"),
    }
}

fn booking_from_row(row: &PgRow) -> Booking {
    Booking {
        id: row.get("id"),
        user_id: row.get("user_id"),
        room_id: row.get("room_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        total_price: row.get("total_price"),
        is_paid: row.get("is_paid"),
        created_at: row.get("created_at"),
    }
}

fn payment_from_row(row: &PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        amount: row.get("amount"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, balance, created_at";

impl BookingStore for PgStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }

    async fn rooms(&self) -> StoreResult<Vec<RoomSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT r.name, c.name AS category, c.price, r.stock
            FROM rooms r
            JOIN categories c ON c.id = r.category_id
            ORDER BY r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let rooms = rows
            .into_iter()
            .map(|row| RoomSummary {
                name: row.get("name"),
                category: row.get("category"),
                price: row.get("price"),
                stock: row.get("stock"),
            })
            .collect();

        Ok(rooms)
    }

    async fn room(&self, room_id: i64) -> StoreResult<Option<RoomView>> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.name, c.name AS category, c.price, r.stock
            FROM rooms r
            JOIN categories c ON c.id = r.category_id
            WHERE r.id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| RoomView {
            id: row.get("id"),
            name: row.get("name"),
            category: row.get("category"),
            price: row.get("price"),
            stock: row.get("stock"),
        }))
    }

    async fn user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingView>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id AS booking_id, b.room_id, r.name AS room_name,
                   c.name AS category, c.price,
                   b.start_date, b.end_date, b.total_price, b.is_paid
            FROM bookings b
            JOIN rooms r ON r.id = b.room_id
            JOIN categories c ON c.id = r.category_id
            WHERE b.user_id = $1
            ORDER BY b.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let bookings = rows
            .into_iter()
            .map(|row| BookingView {
                booking_id: row.get("booking_id"),
                room_id: row.get("room_id"),
                room_name: row.get("room_name"),
                category: row.get("category"),
                price: row.get("price"),
                start_date: row.get("start_date"),
                end_date: row.get("end_date"),
                total_price: row.get("total_price"),
                is_paid: row.get("is_paid"),
            })
            .collect();

        Ok(bookings)
    }

    async fn activity_for_user(&self, user_id: i64) -> StoreResult<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, description, activity_type, reference_id, created_at
            FROM user_activity
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("activity_type");
            entries.push(ActivityEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                description: row.get("description"),
                activity_type: kind.parse().map_err(StoreError::Decode)?,
                reference_id: row.get("reference_id"),
                created_at: row.get("created_at"),
            });
        }

        Ok(entries)
    }
}

/// Unit of work over one PostgreSQL transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork for PgUnitOfWork {
    async fn user_for_update(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn set_balance(&mut self, user_id: i64, balance: f64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn room_for_update(&mut self, room_id: i64) -> StoreResult<Option<RoomRecord>> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.name, r.category_id, c.name AS category_name, c.price, r.stock
            FROM rooms r
            JOIN categories c ON c.id = r.category_id
            WHERE r.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(room_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| RoomRecord {
            id: row.get("id"),
            name: row.get("name"),
            category_id: row.get("category_id"),
            category_name: row.get("category_name"),
            price: row.get("price"),
            stock: row.get("stock"),
        }))
    }

    async fn set_room_stock(&mut self, room_id: i64, stock: i32) -> StoreResult<()> {
        sqlx::query("UPDATE rooms SET stock = $2 WHERE id = $1")
            .bind(room_id)
            .bind(stock)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn booking_for_update(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, room_id, start_date, end_date, total_price, is_paid, created_at
            FROM bookings
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(booking_from_row))
    }

    async fn insert_booking(&mut self, new_booking: NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (user_id, room_id, start_date, end_date, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, room_id, start_date, end_date, total_price, is_paid, created_at
            "#,
        )
        .bind(new_booking.user_id)
        .bind(new_booking.room_id)
        .bind(new_booking.start_date)
        .bind(new_booking.end_date)
        .bind(new_booking.total_price)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(booking_from_row(&row))
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET room_id = $2, start_date = $3, end_date = $4, total_price = $5, is_paid = $6
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.room_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.total_price)
        .bind(booking.is_paid)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn payment_for_booking(&mut self, booking_id: i64) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, booking_id, amount, paid_at, created_at
            FROM payments
            WHERE booking_id = $1
            FOR UPDATE
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(payment_from_row))
    }

    async fn upsert_payment(
        &mut self,
        booking_id: i64,
        amount: f64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Payment> {
        let row = sqlx::query(
            r#"
            INSERT INTO payments (booking_id, amount, paid_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (booking_id)
            DO UPDATE SET amount = EXCLUDED.amount, paid_at = EXCLUDED.paid_at
            RETURNING id, booking_id, amount, paid_at, created_at
            "#,
        )
        .bind(booking_id)
        .bind(amount)
        .bind(paid_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(payment_from_row(&row))
    }

    async fn delete_payment(&mut self, booking_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM payments WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_top_up(&mut self, user_id: i64, amount: f64) -> StoreResult<TopUp> {
        let row = sqlx::query(
            r#"
            INSERT INTO top_ups (user_id, amount)
            VALUES ($1, $2)
            RETURNING id, user_id, amount, created_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(TopUp {
            id: row.get("id"),
            user_id: row.get("user_id"),
            amount: row.get("amount"),
            created_at: row.get("created_at"),
        })
    }

    async fn append_activity(&mut self, entry: NewActivity) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_activity (user_id, description, activity_type, reference_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.description)
        .bind(entry.activity_type.as_str())
        .bind(entry.reference_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
