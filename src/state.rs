use crate::config::BookingPolicy;
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub booking: BookingPolicy,
}
