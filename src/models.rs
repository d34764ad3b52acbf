use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

/// Appointment lifecycle. `Cancelled` and `Completed` are terminal: once a
/// row carries one of them, the settle pass must never overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Case-insensitive parse. Empty or unrecognized input falls back to
    /// `Upcoming`, matching the column default.
    pub fn parse_or_default(raw: &str) -> AppointmentStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => AppointmentStatus::Completed,
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Upcoming,
        }
    }

    /// Strict variant for request input: garbage is rejected, not defaulted.
    pub fn parse(raw: &str) -> Option<AppointmentStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Some(AppointmentStatus::Upcoming),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Upcoming => "Upcoming",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub service: Option<String>,
    pub appointment_time: Option<String>,
    pub message: Option<String>,
    pub cart: Option<String>,
    pub total: Option<f64>,
    pub status: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub name: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub created_at: String,
}

/// One authenticated browser session. The in-progress cart lives here so a
/// booking submission can pick it up server-side.
#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub cart: String,
    pub total: f64,
    pub created_at: String,
}

impl SessionRow {
    pub fn is_admin(&self) -> bool {
        Role::parse(&self.role) == Some(Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub name: String,
    pub price: f64,
}

/// Insert payload for a booking submission.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub customer_id: Option<i64>,
    pub name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub service: Option<String>,
    pub appointment_time: Option<String>,
    pub message: Option<String>,
    pub cart_json: String,
    pub total: f64,
}
