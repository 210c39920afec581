use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::appointments::{
        AppointmentList, AppointmentWithService, BookAppointmentRequest, UpdateStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Appointment, AppointmentStatus, Service, Slot},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Books a slot for the authenticated customer.
///
/// The conflict check and the insert run in one transaction. The SELECT is a
/// fast path that turns the common case into a clean 409; the table's
/// exclusion constraint over tstzrange(start_at, end_at) is what guarantees
/// that two racing requests for overlapping slots cannot both commit — the
/// loser's INSERT fails and is mapped to the same conflict error.
pub async fn book(
    state: &AppState,
    user: &AuthUser,
    payload: BookAppointmentRequest,
) -> AppResult<ApiResponse<Appointment>> {
    if !state.booking.allow_past && payload.start_at < Utc::now() {
        return Err(AppError::BadRequest("Start time is in the past".into()));
    }

    let mut txn = state.pool.begin().await?;

    let service: Option<Service> = sqlx::query_as("SELECT * FROM services WHERE id = $1")
        .bind(payload.service_id)
        .fetch_optional(&mut *txn)
        .await?;
    let service = match service {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let end_at = payload.start_at + Duration::minutes(service.duration_minutes as i64);
    let slot = Slot::new(payload.start_at, end_at)
        .ok_or_else(|| AppError::BadRequest("Service duration must be positive".into()))?;

    // Half-open overlap: an existing row conflicts iff it starts before our
    // end and ends after our start. A row ending exactly at slot.start does
    // not match, so back-to-back bookings pass.
    let conflict: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM appointments
        WHERE status <> 'CANCELLED' AND start_at < $2 AND end_at > $1
        LIMIT 1
        "#,
    )
    .bind(slot.start)
    .bind(slot.end)
    .fetch_optional(&mut *txn)
    .await?;
    if conflict.is_some() {
        return Err(AppError::slot_taken());
    }

    let status = if state.booking.auto_confirm {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Pending
    };

    let inserted = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments (id, customer_id, service_id, start_at, end_at, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(service.id)
    .bind(slot.start)
    .bind(slot.end)
    .bind(status)
    .bind(payload.notes.as_deref())
    .fetch_one(&mut *txn)
    .await;

    let appointment = match inserted {
        Ok(a) => a,
        Err(err) if is_overlap_violation(&err) => return Err(AppError::slot_taken()),
        Err(err) => return Err(err.into()),
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "appointment_book",
        Some("appointments"),
        Some(serde_json::json!({ "appointment_id": appointment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Appointment booked",
        appointment,
        Some(Meta::empty()),
    ))
}

fn is_overlap_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some("appointments_no_overlap")
    )
}

/// Admins see the whole calendar, customers only their own rows, both ordered
/// by start time ascending.
pub async fn list_appointments(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<AppointmentList>> {
    let (page, limit, offset) = pagination.normalize();

    let (items, total): (Vec<AppointmentWithService>, i64) = if user.is_admin() {
        let items = sqlx::query_as(
            r#"
            SELECT a.id, a.customer_id, a.service_id, s.name AS service_name,
                   a.start_at, a.end_at, a.status, a.notes
            FROM appointments a
            JOIN services s ON s.id = a.service_id
            ORDER BY a.start_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;
        let total: (i64,) = sqlx::query_as("SELECT count(*) FROM appointments")
            .fetch_one(&state.pool)
            .await?;
        (items, total.0)
    } else {
        let items = sqlx::query_as(
            r#"
            SELECT a.id, a.customer_id, a.service_id, s.name AS service_name,
                   a.start_at, a.end_at, a.status, a.notes
            FROM appointments a
            JOIN services s ON s.id = a.service_id
            WHERE a.customer_id = $1
            ORDER BY a.start_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user.user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;
        let total: (i64,) =
            sqlx::query_as("SELECT count(*) FROM appointments WHERE customer_id = $1")
                .bind(user.user_id)
                .fetch_one(&state.pool)
                .await?;
        (items, total.0)
    };

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Appointments",
        AppointmentList { items },
        Some(meta),
    ))
}

/// Cancellation is a status change, never a row deletion; the row drops out of
/// future conflict checks once CANCELLED.
pub async fn cancel(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Appointment>> {
    let mut txn = state.pool.begin().await?;

    let appointment: Option<Appointment> =
        sqlx::query_as("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *txn)
            .await?;
    let appointment = match appointment {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    if !user.may_act_on(appointment.customer_id) {
        return Err(AppError::Forbidden);
    }

    if !appointment
        .status
        .can_transition_to(AppointmentStatus::Cancelled)
    {
        return Err(AppError::BadRequest(format!(
            "Cannot cancel a {} appointment",
            appointment.status.as_str()
        )));
    }

    let cancelled: Appointment = sqlx::query_as(
        r#"
        UPDATE appointments
        SET status = 'CANCELLED', updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_one(&mut *txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "appointment_cancel",
        Some("appointments"),
        Some(serde_json::json!({ "appointment_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Appointment cancelled",
        cancelled,
        Some(Meta::empty()),
    ))
}

/// Admin-only generic transition. The requested status is validated against
/// the lifecycle rules rather than accepted unconditionally, so terminal rows
/// stay terminal and the progression never runs backwards.
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<Appointment>> {
    ensure_admin(user)?;

    let mut txn = state.pool.begin().await?;

    let appointment: Option<Appointment> =
        sqlx::query_as("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *txn)
            .await?;
    let appointment = match appointment {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    if !appointment.status.can_transition_to(payload.status) {
        return Err(AppError::BadRequest(format!(
            "Illegal transition {} -> {}",
            appointment.status.as_str(),
            payload.status.as_str()
        )));
    }

    let updated: Appointment = sqlx::query_as(
        r#"
        UPDATE appointments
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .fetch_one(&mut *txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "appointment_status",
        Some("appointments"),
        Some(serde_json::json!({
            "appointment_id": id,
            "status": updated.status.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        updated,
        Some(Meta::empty()),
    ))
}
