use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub booking: BookingPolicy,
    pub reminders: ReminderConfig,
}

/// Booking knobs left open by the product: whether a fresh booking starts out
/// CONFIRMED, and whether start times in the past are accepted (administrators
/// backfilling historical bookings rely on the latter).
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub auto_confirm: bool,
    pub allow_past: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            auto_confirm: false,
            allow_past: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    pub interval_secs: u64,
    pub horizon_hours: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            horizon_hours: 24,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let booking = BookingPolicy {
            auto_confirm: env_bool("BOOKING_AUTO_CONFIRM", false),
            allow_past: env_bool("BOOKING_ALLOW_PAST", true),
        };

        let reminders = ReminderConfig {
            interval_secs: env::var("REMINDER_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
            horizon_hours: env::var("REMINDER_HORIZON_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        Ok(Self {
            database_url,
            host,
            port,
            booking,
            reminders,
        })
    }
}
