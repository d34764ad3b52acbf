use chrono::NaiveDateTime;

use crate::models::{AppointmentRow, AppointmentStatus, CartItem};

/// Outcome of settling one appointment against the clock. `changed` is true
/// only when the stored status should transition; callers persist exactly
/// those rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub status: AppointmentStatus,
    pub changed: bool,
}

/// Resolve an appointment's status. Terminal statuses are kept untouched;
/// a non-terminal appointment whose time has passed settles to `Completed`.
/// Missing or malformed timestamps leave the status alone.
pub fn settle(
    stored_status: Option<&str>,
    appointment_time: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Settlement {
    let status = AppointmentStatus::parse_or_default(stored_status.unwrap_or(""));
    if status.is_terminal() {
        return Settlement {
            status,
            changed: false,
        };
    }

    match appointment_time {
        Some(when) if when < now => Settlement {
            status: AppointmentStatus::Completed,
            changed: true,
        },
        _ => Settlement {
            status,
            changed: false,
        },
    }
}

/// Appointment times arrive from an HTML `datetime-local` input, so the
/// minutes-only form is the common case; seconds show up once a row has been
/// round-tripped through other tooling.
pub fn parse_appointment_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Total-defined cart decode: any malformed payload is an empty cart.
pub fn decode_cart(raw: Option<&str>) -> Vec<CartItem> {
    raw.and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}

pub fn coerce_total(raw: Option<f64>) -> f64 {
    raw.unwrap_or(0.0)
}

/// A raw row resolved for display: decoded cart, numeric total, settled
/// Title-case status. `changed` flags rows whose transition still needs to
/// be written back.
#[derive(Debug, Clone)]
pub struct SettledAppointment {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub gender: String,
    pub service: String,
    pub appointment_time: String,
    pub message: String,
    pub cart: Vec<CartItem>,
    pub total: f64,
    pub status: AppointmentStatus,
    pub changed: bool,
}

pub fn normalize(rows: Vec<AppointmentRow>, now: NaiveDateTime) -> Vec<SettledAppointment> {
    rows.into_iter().map(|row| normalize_one(row, now)).collect()
}

fn normalize_one(row: AppointmentRow, now: NaiveDateTime) -> SettledAppointment {
    let when = row
        .appointment_time
        .as_deref()
        .and_then(parse_appointment_time);
    let settlement = settle(row.status.as_deref(), when, now);

    SettledAppointment {
        id: row.id,
        name: row.name,
        phone: row.phone,
        gender: row.gender.unwrap_or_default(),
        service: row.service.unwrap_or_default(),
        appointment_time: row.appointment_time.unwrap_or_default(),
        message: row.message.unwrap_or_default(),
        cart: decode_cart(row.cart.as_deref()),
        total: coerce_total(row.total),
        status: settlement.status,
        changed: settlement.changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> NaiveDateTime {
        parse_appointment_time(raw).unwrap()
    }

    #[test]
    fn overdue_upcoming_settles_to_completed() {
        let result = settle(
            Some("Upcoming"),
            Some(at("2020-01-01T10:00")),
            at("2024-01-01T00:00"),
        );
        assert_eq!(result.status, AppointmentStatus::Completed);
        assert!(result.changed);
    }

    #[test]
    fn future_upcoming_is_left_alone() {
        let result = settle(
            Some("Upcoming"),
            Some(at("2030-06-01T09:30")),
            at("2024-01-01T00:00"),
        );
        assert_eq!(result.status, AppointmentStatus::Upcoming);
        assert!(!result.changed);
    }

    #[test]
    fn cancelled_is_terminal_regardless_of_case_and_time() {
        for raw in ["cancelled", "Cancelled", "CANCELLED"] {
            let result = settle(
                Some(raw),
                Some(at("2020-01-01T10:00")),
                at("2024-01-01T00:00"),
            );
            assert_eq!(result.status, AppointmentStatus::Cancelled);
            assert!(!result.changed);
        }
    }

    #[test]
    fn completed_stays_completed_without_a_write() {
        let result = settle(
            Some("completed"),
            Some(at("2020-01-01T10:00")),
            at("2024-01-01T00:00"),
        );
        assert_eq!(result.status, AppointmentStatus::Completed);
        assert!(!result.changed);
    }

    #[test]
    fn missing_status_defaults_to_upcoming() {
        let result = settle(None, None, at("2024-01-01T00:00"));
        assert_eq!(result.status, AppointmentStatus::Upcoming);
        assert!(!result.changed);
    }

    #[test]
    fn missing_status_with_past_time_still_completes() {
        let result = settle(
            None,
            Some(at("2020-01-01T10:00")),
            at("2024-01-01T00:00"),
        );
        assert_eq!(result.status, AppointmentStatus::Completed);
        assert!(result.changed);
    }

    #[test]
    fn malformed_timestamp_keeps_stored_status() {
        assert_eq!(parse_appointment_time("next tuesday"), None);
        let result = settle(Some("Upcoming"), None, at("2024-01-01T00:00"));
        assert_eq!(result.status, AppointmentStatus::Upcoming);
        assert!(!result.changed);
    }

    #[test]
    fn datetime_local_and_seconds_forms_both_parse() {
        assert!(parse_appointment_time("2024-03-05T14:30").is_some());
        assert!(parse_appointment_time("2024-03-05T14:30:15").is_some());
        assert!(parse_appointment_time("2024-03-05 14:30:15").is_some());
    }

    #[test]
    fn malformed_cart_decodes_to_empty() {
        assert!(decode_cart(Some("not json")).is_empty());
        assert!(decode_cart(Some("{\"name\":\"x\"}")).is_empty());
        assert!(decode_cart(None).is_empty());
    }

    #[test]
    fn well_formed_cart_decodes() {
        let items = decode_cart(Some(r#"[{"name":"Haircut","price":25.0}]"#));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Haircut");
        assert_eq!(items[0].price, 25.0);
    }

    #[test]
    fn missing_total_coerces_to_zero() {
        assert_eq!(coerce_total(None), 0.0);
        assert_eq!(coerce_total(Some(42.5)), 42.5);
    }

    #[test]
    fn normalize_resolves_rows_for_display() {
        let rows = vec![AppointmentRow {
            id: 7,
            customer_id: Some(1),
            name: "Ana".into(),
            phone: "555-0101".into(),
            gender: None,
            service: Some("Manicure".into()),
            appointment_time: Some("2020-01-01T10:00".into()),
            message: None,
            cart: Some("broken[".into()),
            total: None,
            status: Some("upcoming".into()),
        }];

        let settled = normalize(rows, at("2024-01-01T00:00"));
        assert_eq!(settled.len(), 1);
        let appt = &settled[0];
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert!(appt.changed);
        assert!(appt.cart.is_empty());
        assert_eq!(appt.total, 0.0);
    }
}
