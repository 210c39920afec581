use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::AppointmentStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// Appointment row joined with the booked service's name, the shape the
/// listing endpoint returns.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct AppointmentWithService {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentList {
    pub items: Vec<AppointmentWithService>,
}
