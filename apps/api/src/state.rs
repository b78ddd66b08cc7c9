use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use appointment_cell::services::{Directory, InMemoryDirectory, ReservationSweeper, SupabaseDirectory};
use appointment_cell::store::{AppointmentStore, SlotStore};
use appointment_cell::AppointmentCellState;
use payment_cell::{PaymentCellState, PaymentStore};
use shared_config::AppConfig;
use shared_database::{MemoryDatabase, SupabaseClient};
use shared_utils::{Clock, SystemClock};

/// The three persistence seams, backed by one database.
#[derive(Clone)]
pub struct Stores {
    pub slots: Arc<dyn SlotStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub payments: Arc<dyn PaymentStore>,
}

impl Stores {
    /// Process-local tables for tests and local runs. Lost on restart.
    pub fn memory() -> Self {
        let database = Arc::new(MemoryDatabase::new());
        Self {
            slots: database.clone(),
            appointments: database.clone(),
            payments: database,
        }
    }

    /// PostgREST tables; see `libs/shared/database/sql/booking_schema.sql`.
    pub fn supabase(client: Arc<SupabaseClient>) -> Self {
        Self {
            slots: client.clone(),
            appointments: client.clone(),
            payments: client,
        }
    }
}

/// Everything the router and the background sweeper share.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub appointments: Arc<AppointmentCellState>,
    pub payments: Arc<PaymentCellState>,
    pub sweeper: Arc<ReservationSweeper>,
}

impl AppState {
    /// Production wiring: Supabase directory and stores when configured,
    /// system clock.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let (directory, stores): (Arc<dyn Directory>, Stores) = if config.is_configured() {
            info!("Using Supabase directory and stores at {}", config.supabase_url);
            let client = Arc::new(SupabaseClient::new(&config));
            (Arc::new(SupabaseDirectory::new(Arc::clone(&client))), Stores::supabase(client))
        } else {
            warn!("Supabase not configured; bookings and payments are kept in memory and lost on restart");
            (Arc::new(InMemoryDirectory::with_default_types()), Stores::memory())
        };

        Self::assemble(config, directory, stores, Arc::new(SystemClock))
    }

    pub fn assemble(
        config: Arc<AppConfig>,
        directory: Arc<dyn Directory>,
        stores: Stores,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let appointments = Arc::new(AppointmentCellState::new(
            Arc::clone(&config),
            Arc::clone(&directory),
            Arc::clone(&stores.slots),
            Arc::clone(&stores.appointments),
            Arc::clone(&clock),
        ));
        let payments = Arc::new(PaymentCellState::new(
            Arc::clone(&config),
            directory,
            Arc::clone(&stores.appointments),
            Arc::clone(&stores.payments),
            Arc::clone(&clock),
        ));
        let sweeper = Arc::new(ReservationSweeper::new(
            Arc::clone(&stores.appointments),
            clock,
            Duration::from_secs(config.reservation_sweep_interval_seconds.max(1)),
        ));

        Self { config, stores, appointments, payments, sweeper }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[tokio::test]
    async fn test_unconfigured_supabase_falls_back_to_memory() {
        let mut config = TestConfig::default().to_app_config();
        config.supabase_url = String::new();
        let state = AppState::from_config(Arc::new(config));

        let types = state.appointments.directory.list_appointment_types().await.unwrap();
        assert_eq!(types.len(), 2);
        assert!(state.stores.appointments.list_appointments(None).await.unwrap().is_empty());
    }
}
