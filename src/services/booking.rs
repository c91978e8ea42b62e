//! Booking and capacity tracking.
//!
//! A booking and the participant increment on its session are written in
//! the same transaction. The increment itself is guarded by the store so two
//! concurrent bookings cannot both take the last seat.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{
    blank_to_none, Booking, BookingDetails, BookingStatus, NewBooking, NewUser, PaymentStatus,
    Store, StoreTx, User, UserRole, UserStatus,
};
use crate::error::{AppError, AppResult};
use crate::telemetry;

/// Trainees created through a booking never log in with this hash.
const PLACEHOLDER_HASH_COST: u32 = 4;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TraineeContact {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    pub phone: Option<String>,
    pub region: Option<String>,
}

impl TraineeContact {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone = blank_to_none(self.phone);
        self.region = blank_to_none(self.region);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub session_id: i64,
    pub trainee: TraineeContact,
    pub special_requirements: Option<String>,
}

/// `TC-<yyyymmdd>-<8 hex chars>`; uniqueness is enforced by the store.
pub fn confirmation_code(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TC-{}-{}", now.format("%Y%m%d"), suffix)
}

async fn find_or_create_trainee(tx: &mut dyn StoreTx, contact: &TraineeContact) -> AppResult<User> {
    if let Some(user) = tx.user_by_email(&contact.email).await? {
        return Ok(user);
    }

    let password_hash = bcrypt::hash(Uuid::new_v4().simple().to_string(), PLACEHOLDER_HASH_COST)
        .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {}", e)))?;

    let user = tx
        .insert_user(&NewUser {
            email: contact.email.clone(),
            password_hash,
            role: UserRole::Trainee,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            region: contact.region.clone(),
            status: UserStatus::Pending,
        })
        .await?;
    info!(user_id = user.id, "Created trainee account from booking");
    Ok(user)
}

/// Book one seat on a session for the given trainee. The trainee account is
/// created on first booking and reused afterwards.
pub async fn book(store: &dyn Store, request: BookingRequest, now: DateTime<Utc>) -> AppResult<Booking> {
    let trainee = request.trainee.normalized();
    trainee.validate()?;

    let mut tx = store.begin().await?;
    let session = tx
        .session(request.session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {}", request.session_id)))?;

    if !session.status.is_bookable() {
        return Err(AppError::Validation(format!(
            "session {} is {} and cannot be booked",
            session.id, session.status
        )));
    }
    if session.available_spots() <= 0 {
        return Err(AppError::Capacity(session.id));
    }

    let user = find_or_create_trainee(tx.as_mut(), &trainee).await?;
    let booking = tx
        .insert_booking(&NewBooking {
            user_id: user.id,
            session_id: session.id,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Unpaid,
            confirmation_code: confirmation_code(now),
            notes: blank_to_none(request.special_requirements),
        })
        .await?;

    // Another transaction may have taken the last seat since the read above.
    if !tx.increment_participants(session.id).await? {
        return Err(AppError::Capacity(session.id));
    }
    tx.commit().await?;

    info!(
        booking_id = booking.id,
        session_id = session.id,
        code = %booking.confirmation_code,
        "Booking confirmed"
    );
    telemetry::record_counter("bookings_confirmed_total", 1, &[]);
    Ok(booking)
}

/// Delete a booking and release its seat.
pub async fn remove(store: &dyn Store, booking_id: i64) -> AppResult<Booking> {
    let mut tx = store.begin().await?;
    let booking = tx
        .booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", booking_id)))?;

    if !tx.delete_booking(booking.id).await? {
        return Err(AppError::NotFound(format!("booking {}", booking_id)));
    }
    if !tx.decrement_participants(booking.session_id).await? {
        warn!(
            session_id = booking.session_id,
            "Participant count already at zero while removing a booking"
        );
    }
    tx.commit().await?;

    info!(booking_id, session_id = booking.session_id, "Booking removed");
    Ok(booking)
}

/// Change the booking and payment status. Seat counts are not touched.
pub async fn update_status(
    store: &dyn Store,
    booking_id: i64,
    status: BookingStatus,
    payment_status: PaymentStatus,
) -> AppResult<Booking> {
    let mut tx = store.begin().await?;
    let booking = tx
        .update_booking_status(booking_id, status, payment_status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", booking_id)))?;
    tx.commit().await?;

    info!(booking_id, ?status, ?payment_status, "Booking status updated");
    Ok(booking)
}

pub async fn details_by_code(store: &dyn Store, code: &str) -> AppResult<BookingDetails> {
    let mut tx = store.begin().await?;
    tx.booking_by_code(code.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", code)))
}
