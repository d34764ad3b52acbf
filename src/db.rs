use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_session_id},
    models::{
        AppointmentRow, NewAppointment, ReviewRow, Role, SessionRow, UserRow,
    },
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Create the parent directory for a file-backed sqlite URL so the first
/// connect doesn't fail on a missing path.
pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let Some(raw) = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let raw = raw.split('?').next().unwrap_or(raw);
    if raw.is_empty() || raw == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(raw.strip_prefix("file:").unwrap_or(raw)).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Seed the single admin account. Safe to call on every startup.
pub async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(Role::Admin.as_str())
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let username = env::var("ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    if password == "admin123" {
        log::warn!("ADMIN_PASSWORD not set. Using the default password. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;

    sqlx::query("INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password_hash)
        .bind(Role::Admin.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

// --- users ---

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role FROM users WHERE username = ? LIMIT 1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT id, username, password_hash, role FROM users ORDER BY id")
        .fetch_all(pool)
        .await
}

// --- appointments ---

pub async fn insert_appointment(
    pool: &SqlitePool,
    appointment: &NewAppointment,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO appointments
           (customer_id, name, phone, gender, service, appointment_time, message, cart, total, status)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'Upcoming')"#,
    )
    .bind(appointment.customer_id)
    .bind(&appointment.name)
    .bind(&appointment.phone)
    .bind(&appointment.gender)
    .bind(&appointment.service)
    .bind(&appointment.appointment_time)
    .bind(&appointment.message)
    .bind(&appointment.cart_json)
    .bind(appointment.total)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn all_appointments(pool: &SqlitePool) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, customer_id, name, phone, gender, service, appointment_time,
                  message, cart, total, status
           FROM appointments
           ORDER BY appointment_time ASC"#,
    )
    .fetch_all(pool)
    .await
}

pub async fn appointments_for_customer(
    pool: &SqlitePool,
    customer_id: i64,
) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, customer_id, name, phone, gender, service, appointment_time,
                  message, cart, total, status
           FROM appointments
           WHERE customer_id = ?
           ORDER BY appointment_time DESC"#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn set_appointment_status(
    pool: &SqlitePool,
    appointment_id: i64,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(status)
        .bind(appointment_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Guarded settle write: transitions to Completed only while the stored
/// status is still non-terminal, so a concurrent cancellation wins.
pub async fn complete_if_open(pool: &SqlitePool, appointment_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE appointments SET status = 'Completed'
           WHERE id = ?
             AND LOWER(COALESCE(status, '')) NOT IN ('cancelled', 'completed')"#,
    )
    .bind(appointment_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_appointment(pool: &SqlitePool, appointment_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(appointment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// --- reviews ---

pub async fn insert_review(
    pool: &SqlitePool,
    customer_id: Option<i64>,
    name: Option<&str>,
    rating: Option<i64>,
    comment: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO reviews (customer_id, name, rating, comment, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(customer_id)
    .bind(name)
    .bind(rating)
    .bind(comment)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn all_reviews(pool: &SqlitePool) -> Result<Vec<ReviewRow>, sqlx::Error> {
    sqlx::query_as::<_, ReviewRow>(
        "SELECT id, customer_id, name, rating, comment, created_at FROM reviews ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

// --- sessions ---

pub async fn create_session(pool: &SqlitePool, user: &UserRow) -> Result<SessionRow, sqlx::Error> {
    let session = SessionRow {
        id: new_session_id(),
        user_id: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        cart: "[]".to_string(),
        total: 0.0,
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"INSERT INTO sessions (id, user_id, username, role, cart, total, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(&session.username)
    .bind(&session.role)
    .bind(&session.cart)
    .bind(session.total)
    .bind(&session.created_at)
    .execute(pool)
    .await?;

    Ok(session)
}

pub async fn find_session(pool: &SqlitePool, session_id: &str) -> Option<SessionRow> {
    sqlx::query_as::<_, SessionRow>(
        r#"SELECT id, user_id, username, role, cart, total, created_at
           FROM sessions WHERE id = ? LIMIT 1"#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn update_session_cart(
    pool: &SqlitePool,
    session_id: &str,
    cart_json: &str,
    total: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET cart = ?, total = ? WHERE id = ?")
        .bind(cart_json)
        .bind(total)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        // one connection, or every statement would see a different :memory: db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    fn booking(name: &str) -> NewAppointment {
        NewAppointment {
            customer_id: None,
            name: name.to_string(),
            phone: "555-0100".to_string(),
            gender: None,
            service: Some("Haircut".to_string()),
            appointment_time: Some("2030-01-01T10:00".to_string()),
            message: None,
            cart_json: "[]".to_string(),
            total: 0.0,
        }
    }

    #[actix_web::test]
    async fn duplicate_username_is_rejected() {
        let pool = test_pool().await;
        create_user(&pool, "maria", "hash-a", Role::Customer)
            .await
            .unwrap();

        let second = create_user(&pool, "maria", "hash-b", Role::Customer).await;
        assert!(second.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'maria'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn admin_seed_is_idempotent() {
        let pool = test_pool().await;
        seed_admin(&pool).await.unwrap();
        seed_admin(&pool).await.unwrap();

        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }

    #[actix_web::test]
    async fn delete_removes_exactly_one_appointment() {
        let pool = test_pool().await;
        let first = insert_appointment(&pool, &booking("Ana")).await.unwrap();
        let second = insert_appointment(&pool, &booking("Bea")).await.unwrap();

        let removed = delete_appointment(&pool, first).await.unwrap();
        assert_eq!(removed, 1);

        let rows = all_appointments(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, second);
    }

    #[actix_web::test]
    async fn settle_write_never_clobbers_a_cancellation() {
        let pool = test_pool().await;
        let id = insert_appointment(&pool, &booking("Ana")).await.unwrap();
        set_appointment_status(&pool, id, "cancelled").await.unwrap();

        complete_if_open(&pool, id).await.unwrap();

        let status: String = sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "cancelled");
    }

    #[actix_web::test]
    async fn settle_write_completes_an_open_appointment() {
        let pool = test_pool().await;
        let id = insert_appointment(&pool, &booking("Ana")).await.unwrap();

        complete_if_open(&pool, id).await.unwrap();
        // second pass is a no-op, not an error
        complete_if_open(&pool, id).await.unwrap();

        let status: String = sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "Completed");
    }

    #[actix_web::test]
    async fn session_cart_roundtrip() {
        let pool = test_pool().await;
        create_user(&pool, "maria", "hash", Role::Customer)
            .await
            .unwrap();
        let user = find_user_by_username(&pool, "maria").await.unwrap().unwrap();

        let session = create_session(&pool, &user).await.unwrap();
        update_session_cart(&pool, &session.id, r#"[{"name":"Facial","price":30.0}]"#, 30.0)
            .await
            .unwrap();

        let reloaded = find_session(&pool, &session.id).await.unwrap();
        assert_eq!(reloaded.total, 30.0);
        assert!(reloaded.cart.contains("Facial"));

        delete_session(&pool, &session.id).await.unwrap();
        assert!(find_session(&pool, &session.id).await.is_none());
    }
}
