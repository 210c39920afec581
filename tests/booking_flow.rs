use std::sync::Mutex;

use axum_booking_api::{
    config::BookingPolicy,
    db::create_pool,
    dto::appointments::{BookAppointmentRequest, UpdateStatusRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{AppointmentStatus, Role},
    reminder::{Notifier, ReminderDue, sweep_due_reminders},
    routes::params::Pagination,
    services::appointment_service,
    state::AppState,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

// All tests share one database and one global calendar (the exclusion
// constraint spans every non-cancelled row), so they take this lock and
// truncate before running.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    sqlx::query("TRUNCATE TABLE appointments, audit_logs, services, users CASCADE")
        .execute(&pool)
        .await?;

    Ok(Some(AppState {
        pool,
        booking: BookingPolicy::default(),
    }))
}

async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, 'dummy', $3)")
        .bind(id)
        .bind(email)
        .bind(role)
        .execute(&state.pool)
        .await?;
    Ok(AuthUser { user_id: id, role })
}

async fn create_service(state: &AppState, duration_minutes: i32) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO services (id, name, description, duration_minutes, price_cents)
        VALUES ($1, $2, 'test service', $3, 3500)
        "#,
    )
    .bind(id)
    .bind(format!("Service {id}"))
    .bind(duration_minutes)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

fn jan(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, hour, min, 0).unwrap()
}

// The spec scenario: a 30-minute service booked at 10:00 occupies [10:00,
// 10:30); an overlapping request is rejected with a conflict, a back-to-back
// request is accepted, and cancelling frees the interval for rebooking.
#[tokio::test]
async fn booking_conflicts_and_adjacency() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer, "alice@example.com").await?;
    let service_id = create_service(&state, 30).await?;

    let booked = appointment_service::book(
        &state,
        &customer,
        BookAppointmentRequest {
            service_id,
            start_at: jan(10, 0),
            notes: Some("first".into()),
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(booked.end_at, jan(10, 30));
    assert_eq!(booked.status, AppointmentStatus::Pending);

    // Overlapping request is rejected.
    let overlap = appointment_service::book(
        &state,
        &customer,
        BookAppointmentRequest {
            service_id,
            start_at: jan(10, 15),
            notes: None,
        },
    )
    .await;
    assert!(matches!(overlap, Err(AppError::Conflict(_))));

    // Back-to-back request starting exactly at the previous end is accepted.
    let adjacent = appointment_service::book(
        &state,
        &customer,
        BookAppointmentRequest {
            service_id,
            start_at: jan(10, 30),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(adjacent.start_at, jan(10, 30));

    // Cancelling frees the interval for an exact rebooking.
    appointment_service::cancel(&state, &customer, booked.id).await?;
    let rebooked = appointment_service::book(
        &state,
        &customer,
        BookAppointmentRequest {
            service_id,
            start_at: jan(10, 0),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(rebooked.start_at, jan(10, 0));
    assert_eq!(rebooked.end_at, jan(10, 30));

    Ok(())
}

// N concurrent requests for pairwise-overlapping intervals must produce
// exactly one created appointment; every loser gets a conflict.
#[tokio::test]
async fn concurrent_bookings_admit_exactly_one() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer, "bob@example.com").await?;
    let service_id = create_service(&state, 60).await?;

    let mut handles = Vec::new();
    for i in 0..5u32 {
        let state = state.clone();
        let customer = customer.clone();
        // Staggered starts, all overlapping the 14:00-15:00 hour.
        let start_at = jan(14, 0) + Duration::minutes(i as i64 * 10);
        handles.push(tokio::spawn(async move {
            appointment_service::book(
                &state,
                &customer,
                BookAppointmentRequest {
                    service_id,
                    start_at,
                    notes: None,
                },
            )
            .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(err) => panic!("unexpected booking error: {err:?}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 4);

    let count: (i64,) =
        sqlx::query_as("SELECT count(*) FROM appointments WHERE status <> 'CANCELLED'")
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(count.0, 1);

    Ok(())
}

#[tokio::test]
async fn lifecycle_roles_and_ownership() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let alice = create_user(&state, Role::Customer, "alice@example.com").await?;
    let mallory = create_user(&state, Role::Customer, "mallory@example.com").await?;
    let admin = create_user(&state, Role::Admin, "admin@example.com").await?;
    let service_id = create_service(&state, 30).await?;

    let appointment = appointment_service::book(
        &state,
        &alice,
        BookAppointmentRequest {
            service_id,
            start_at: jan(9, 0),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();

    // Customers cannot drive the status machine, not even on their own rows.
    let denied = appointment_service::update_status(
        &state,
        &alice,
        appointment.id,
        UpdateStatusRequest {
            status: AppointmentStatus::Paid,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Another customer cannot cancel Alice's appointment.
    let denied = appointment_service::cancel(&state, &mallory, appointment.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Admin walks the row forward.
    let confirmed = appointment_service::update_status(
        &state,
        &admin,
        appointment.id,
        UpdateStatusRequest {
            status: AppointmentStatus::Confirmed,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let paid = appointment_service::update_status(
        &state,
        &admin,
        appointment.id,
        UpdateStatusRequest {
            status: AppointmentStatus::Paid,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(paid.status, AppointmentStatus::Paid);

    // Backwards transitions are rejected even for admins.
    let illegal = appointment_service::update_status(
        &state,
        &admin,
        appointment.id,
        UpdateStatusRequest {
            status: AppointmentStatus::Pending,
        },
    )
    .await;
    assert!(matches!(illegal, Err(AppError::BadRequest(_))));

    let completed = appointment_service::update_status(
        &state,
        &admin,
        appointment.id,
        UpdateStatusRequest {
            status: AppointmentStatus::Completed,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    // Terminal rows stay terminal: no cancellation of a completed appointment.
    let terminal = appointment_service::cancel(&state, &admin, appointment.id).await;
    assert!(matches!(terminal, Err(AppError::BadRequest(_))));

    // Admin may cancel another customer's (non-terminal) appointment.
    let second = appointment_service::book(
        &state,
        &mallory,
        BookAppointmentRequest {
            service_id,
            start_at: jan(11, 0),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    let cancelled = appointment_service::cancel(&state, &admin, second.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn listing_scopes_by_role_and_orders_by_start() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let alice = create_user(&state, Role::Customer, "alice@example.com").await?;
    let bob = create_user(&state, Role::Customer, "bob@example.com").await?;
    let admin = create_user(&state, Role::Admin, "admin@example.com").await?;
    let service_id = create_service(&state, 30).await?;

    // Book out of chronological order.
    for (user, hour) in [(&alice, 15u32), (&bob, 9), (&alice, 12)] {
        appointment_service::book(
            &state,
            user,
            BookAppointmentRequest {
                service_id,
                start_at: jan(hour, 0),
                notes: None,
            },
        )
        .await?;
    }

    let pagination = Pagination {
        page: None,
        per_page: None,
    };

    let all = appointment_service::list_appointments(&state, &admin, pagination)
        .await?
        .data
        .unwrap();
    assert_eq!(all.items.len(), 3);
    let starts: Vec<_> = all.items.iter().map(|a| a.start_at).collect();
    assert_eq!(starts, vec![jan(9, 0), jan(12, 0), jan(15, 0)]);

    let own = appointment_service::list_appointments(&state, &alice, pagination)
        .await?
        .data
        .unwrap();
    assert_eq!(own.items.len(), 2);
    assert!(own.items.iter().all(|a| a.customer_id == alice.user_id));

    Ok(())
}

#[tokio::test]
async fn booking_unknown_service_is_not_found() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer, "alice@example.com").await?;
    let missing = appointment_service::book(
        &state,
        &customer,
        BookAppointmentRequest {
            service_id: Uuid::new_v4(),
            start_at: jan(10, 0),
            notes: None,
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    Ok(())
}

struct CollectingNotifier(Mutex<Vec<ReminderDue>>);

impl Notifier for CollectingNotifier {
    fn send(&self, due: &ReminderDue) {
        self.0.lock().unwrap().push(due.clone());
    }
}

#[tokio::test]
async fn reminder_sweep_selects_confirmed_in_window_once() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer, "alice@example.com").await?;
    let service_id = create_service(&state, 30).await?;

    let pool = state.pool.clone();
    let customer_id = customer.user_id;
    let insert = move |start: DateTime<Utc>, status: AppointmentStatus| {
        let pool = pool.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO appointments (id, customer_id, service_id, start_at, end_at, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(customer_id)
            .bind(service_id)
            .bind(start)
            .bind(start + Duration::minutes(30))
            .bind(status)
            .execute(&pool)
            .await
        }
    };

    let now = Utc::now();
    // In window and confirmed: selected.
    insert(now + Duration::hours(23), AppointmentStatus::Confirmed).await?;
    // Past the horizon: excluded.
    insert(now + Duration::hours(25), AppointmentStatus::Confirmed).await?;
    // In window but still pending: excluded.
    insert(now + Duration::hours(2), AppointmentStatus::Pending).await?;

    let notifier = CollectingNotifier(Mutex::new(Vec::new()));
    let due = sweep_due_reminders(&state.pool, 24, &notifier).await?;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].recipient, "alice@example.com");
    assert_eq!(notifier.0.lock().unwrap().len(), 1);

    // The marker keeps the second sweep from re-notifying.
    let again = sweep_due_reminders(&state.pool, 24, &notifier).await?;
    assert!(again.is_empty());

    Ok(())
}
