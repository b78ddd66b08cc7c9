pub mod availability;
pub mod booking;
pub mod confirmation;
pub mod directory;
pub mod reservation;
pub mod views;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use confirmation::AdminConfirmationService;
pub use directory::{Directory, InMemoryDirectory, SupabaseDirectory};
pub use reservation::ReservationSweeper;
pub use views::describe_appointments;
