pub mod blocked_date;
pub mod booking;

pub use blocked_date::BlockedDate;
pub use booking::{Booking, BookingStatus, LocationType, NewBooking, TimeSlot};
