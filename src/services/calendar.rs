use crate::models::Booking;

/// Renders a confirmed booking as an iCalendar event spanning its time
/// slot band. Times are business-local floating times (no TZID), matching
/// what the customer was told.
pub fn generate_ics(booking: &Booking, business_name: &str) -> Option<String> {
    let date = booking.confirmed_date?;
    let slot = booking.confirmed_slot?;
    let (start_hour, end_hour) = slot.hours();

    let dtstart = format!("{}T{:02}0000", date.format("%Y%m%d"), start_hour);
    let dtend = format!("{}T{:02}0000", date.format("%Y%m%d"), end_hour);
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@aura-booking", booking.token);

    let summary = format!("{} with {}", booking.service, business_name);
    let description = match booking.address.as_deref() {
        Some(address) => format!("Location: {address}"),
        None => "We'll come to you - address as arranged".to_string(),
    };

    Some(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Aura Mobile Massage//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, LocationType, TimeSlot};
    use chrono::{NaiveDate, NaiveDateTime};

    fn confirmed_booking() -> Booking {
        let created =
            NaiveDateTime::parse_from_str("2025-05-20 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "b-1".to_string(),
            token: "AUR-7MK2XQ".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@x.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service: "Swedish Massage".to_string(),
            location_type: LocationType::Home,
            address: Some("12 Cactus Way".to_string()),
            preferred_date: None,
            preferred_slot: None,
            pressure: None,
            message: None,
            confirmed_date: NaiveDate::parse_from_str("2025-06-02", "%Y-%m-%d").ok(),
            confirmed_slot: Some(TimeSlot::Afternoon),
            admin_notes: None,
            cancellation_reason: None,
            status: BookingStatus::Confirmed,
            created_at: created,
            updated_at: created,
            confirmed_at: Some(created),
            completed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_generate_ics_spans_the_slot() {
        let ics = generate_ics(&confirmed_booking(), "Aura Mobile Massage").unwrap();
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("DTSTART:20250602T120000"));
        assert!(ics.contains("DTEND:20250602T160000"));
        assert!(ics.contains("SUMMARY:Swedish Massage with Aura Mobile Massage"));
        assert!(ics.contains("DESCRIPTION:Location: 12 Cactus Way"));
        assert!(ics.contains("UID:AUR-7MK2XQ@aura-booking"));
        assert!(ics.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_generate_ics_requires_confirmed_schedule() {
        let mut booking = confirmed_booking();
        booking.confirmed_date = None;
        assert!(generate_ics(&booking, "Aura Mobile Massage").is_none());
    }

    #[test]
    fn test_generate_ics_without_address() {
        let mut booking = confirmed_booking();
        booking.address = None;
        let ics = generate_ics(&booking, "Aura Mobile Massage").unwrap();
        assert!(ics.contains("DESCRIPTION:We'll come to you"));
    }
}
