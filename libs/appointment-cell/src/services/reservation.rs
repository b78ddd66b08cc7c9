use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument};

use shared_utils::Clock;

use crate::models::{AppointmentError, ReleasedReservation};
use crate::store::AppointmentStore;

/// Periodically returns slots whose unpaid reservation lease expired.
pub struct ReservationSweeper {
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    is_running: RwLock<bool>,
}

impl ReservationSweeper {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            appointments,
            clock,
            sweep_interval,
            is_running: RwLock::new(true),
        }
    }

    pub async fn sweep_once(&self) -> Result<Vec<ReleasedReservation>, AppointmentError> {
        let released = self.appointments.release_expired_reservations(self.clock.now()).await?;

        for reservation in &released {
            info!("Released slot {} (appointment {:?}) after unpaid lease expired",
                  reservation.slot_id, reservation.appointment_id);
        }
        Ok(released)
    }

    #[instrument(skip(self))]
    pub async fn run(self: Arc<Self>) {
        info!("Reservation sweeper started (every {:?})", self.sweep_interval);

        let mut sweep_interval = interval(self.sweep_interval);
        loop {
            sweep_interval.tick().await;

            if !*self.is_running.read().await {
                debug!("Reservation sweeper stopping due to shutdown");
                break;
            }

            if let Err(e) = self.sweep_once().await {
                error!("Reservation sweep failed: {}", e);
            }
        }

        debug!("Reservation sweeper ended");
    }

    pub async fn shutdown(&self) {
        *self.is_running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}
