use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{config::ReminderConfig, db::DbPool, error::AppResult};

/// One outbound reminder: recipient, booked service, and when the slot starts.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderDue {
    pub appointment_id: Uuid,
    pub recipient: String,
    pub service_name: String,
    pub start_at: DateTime<Utc>,
}

/// Dispatch seam; the real gateway (mail/SMS) lives behind this.
pub trait Notifier: Send + Sync {
    fn send(&self, due: &ReminderDue);
}

/// Default dispatcher: structured log lines in place of a mail gateway.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, due: &ReminderDue) {
        tracing::info!(
            appointment_id = %due.appointment_id,
            recipient = %due.recipient,
            service = %due.service_name,
            start_at = %due.start_at,
            "sending appointment reminder"
        );
    }
}

/// Selects CONFIRMED appointments starting within the horizon that have not
/// been reminded yet and marks them in the same statement, so a row is handed
/// to the notifier at most once even across overlapping sweeps.
pub async fn sweep_due_reminders(
    pool: &DbPool,
    horizon_hours: i64,
    notifier: &dyn Notifier,
) -> AppResult<Vec<ReminderDue>> {
    let now = Utc::now();
    let until = now + Duration::hours(horizon_hours);

    let due: Vec<ReminderDue> = sqlx::query_as(
        r#"
        UPDATE appointments a
        SET last_reminded_at = now()
        FROM users u, services s
        WHERE u.id = a.customer_id
          AND s.id = a.service_id
          AND a.status = 'CONFIRMED'
          AND a.start_at >= $1
          AND a.start_at < $2
          AND a.last_reminded_at IS NULL
        RETURNING a.id AS appointment_id, u.email AS recipient,
                  s.name AS service_name, a.start_at
        "#,
    )
    .bind(now)
    .bind(until)
    .fetch_all(pool)
    .await?;

    for reminder in &due {
        notifier.send(reminder);
    }

    Ok(due)
}

/// Hourly (by default) background loop; sweep failures are logged and the
/// loop keeps running.
pub async fn run_reminder_loop(pool: DbPool, config: ReminderConfig, notifier: Arc<dyn Notifier>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(config.interval_secs));
    loop {
        ticker.tick().await;
        match sweep_due_reminders(&pool, config.horizon_hours, notifier.as_ref()).await {
            Ok(due) if due.is_empty() => {}
            Ok(due) => tracing::info!(count = due.len(), "reminders dispatched"),
            Err(err) => tracing::error!(error = %err, "reminder sweep failed"),
        }
    }
}
