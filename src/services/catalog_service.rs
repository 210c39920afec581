use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::services::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Service,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_services(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Service>(
        "SELECT * FROM services ORDER BY created_at LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM services")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Services",
        ServiceList { items },
        Some(meta),
    ))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let result = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let result = match result {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Service", result, None))
}

pub async fn create_service(
    state: &AppState,
    user: &AuthUser,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_admin(user)?;
    validate_fields(payload.duration_minutes, payload.price_cents)?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services (id, name, description, duration_minutes, price_cents)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.duration_minutes)
    .bind(payload.price_cents)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "service_create",
        Some("services"),
        Some(serde_json::json!({ "service_id": service.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Service created",
        service,
        Some(Meta::empty()),
    ))
}

pub async fn update_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_admin(user)?;

    let existing = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.or(existing.description);
    let duration_minutes = payload.duration_minutes.unwrap_or(existing.duration_minutes);
    let price_cents = payload.price_cents.unwrap_or(existing.price_cents);
    validate_fields(duration_minutes, price_cents)?;

    // Existing appointments keep the end times computed at booking; this only
    // affects bookings made from now on.
    let service = sqlx::query_as::<_, Service>(
        r#"
        UPDATE services
        SET name = $2, description = $3, duration_minutes = $4, price_cents = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(duration_minutes)
    .bind(price_cents)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "service_update",
        Some("services"),
        Some(serde_json::json!({ "service_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        service,
        Some(Meta::empty()),
    ))
}

pub async fn delete_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await;

    let result = match result {
        Ok(r) => r,
        Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            return Err(AppError::BadRequest(
                "Service is referenced by existing appointments".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "service_delete",
        Some("services"),
        Some(serde_json::json!({ "service_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_fields(duration_minutes: i32, price_cents: i64) -> AppResult<()> {
    if duration_minutes <= 0 {
        return Err(AppError::BadRequest(
            "duration_minutes must be positive".into(),
        ));
    }
    if price_cents < 0 {
        return Err(AppError::BadRequest(
            "price_cents must not be negative".into(),
        ));
    }
    Ok(())
}
