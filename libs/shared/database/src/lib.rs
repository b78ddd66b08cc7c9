pub mod memory;
pub mod rows;
pub mod supabase;

pub use memory::{DatabaseError, MemoryDatabase, Tables};
pub use rows::{filter_timestamp, AppointmentRow, PaymentRow, SlotRow};
pub use supabase::SupabaseClient;
