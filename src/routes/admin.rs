use actix_web::{web, HttpRequest, HttpResponse, Result};
use askama::Template;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::current_session,
    db,
    filters,
    models::{AppointmentStatus, CartItem, SessionRow},
    routes::public::ReviewView,
    settle::{self, SettledAppointment},
    state::AppState,
    templates::{redirect, render},
};

#[derive(Clone, Debug)]
struct AppointmentView {
    id: i64,
    name: String,
    phone: String,
    gender: String,
    service: String,
    appointment_time: String,
    message: String,
    has_message: bool,
    cart: Vec<CartItem>,
    total: f64,
    status: String,
}

impl AppointmentView {
    fn from_settled(appt: SettledAppointment) -> Self {
        AppointmentView {
            id: appt.id,
            name: appt.name,
            phone: appt.phone,
            gender: appt.gender,
            service: appt.service,
            appointment_time: appt.appointment_time,
            has_message: !appt.message.trim().is_empty(),
            message: appt.message,
            cart: appt.cart,
            total: appt.total,
            status: appt.status.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct UserView {
    id: i64,
    username: String,
    role: String,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    appointments: Vec<AppointmentView>,
    upcoming_count: i64,
    completed_count: i64,
    cancelled_count: i64,
    current_filter: String,
}

#[derive(Template)]
#[template(path = "admin_reviews.html")]
struct AdminReviewsTemplate {
    reviews: Vec<ReviewView>,
}

#[derive(Template)]
#[template(path = "admin_users.html")]
struct AdminUsersTemplate {
    users: Vec<UserView>,
}

#[derive(Deserialize)]
struct StatusFilter {
    status: Option<String>,
}

#[derive(Deserialize)]
struct UpdateStatusForm {
    appointment_id: Option<i64>,
    status: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/admin").route(web::get().to(dashboard)))
        .service(web::resource("/admin/update_status").route(web::post().to(update_status)))
        .service(web::resource("/admin/delete/{id}").route(web::get().to(delete_appointment)))
        .service(web::resource("/admin/reviews").route(web::get().to(reviews)))
        .service(web::resource("/admin/users").route(web::get().to(users)));
}

async fn admin_session(state: &AppState, req: &HttpRequest) -> Option<SessionRow> {
    current_session(state, req).await.filter(SessionRow::is_admin)
}

async fn dashboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<StatusFilter>,
) -> Result<HttpResponse> {
    if admin_session(&state, &req).await.is_none() {
        return Ok(redirect("/login"));
    }

    let rows = db::all_appointments(&state.db).await.unwrap_or_default();
    let settled = settle::normalize(rows, Local::now().naive_local());

    for appt in settled.iter().filter(|appt| appt.changed) {
        if let Err(err) = db::complete_if_open(&state.db, appt.id).await {
            log::warn!("Failed to settle appointment {}: {err}", appt.id);
        }
    }

    let mut upcoming_count = 0;
    let mut completed_count = 0;
    let mut cancelled_count = 0;
    for appt in &settled {
        match appt.status {
            AppointmentStatus::Upcoming => upcoming_count += 1,
            AppointmentStatus::Completed => completed_count += 1,
            AppointmentStatus::Cancelled => cancelled_count += 1,
        }
    }

    let current_filter = query
        .into_inner()
        .status
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "All".to_string());

    let selected = AppointmentStatus::parse(&current_filter);
    let appointments = settled
        .into_iter()
        .filter(|appt| selected.map_or(true, |status| appt.status == status))
        .map(AppointmentView::from_settled)
        .collect();

    Ok(render(AdminDashboardTemplate {
        appointments,
        upcoming_count,
        completed_count,
        cancelled_count,
        current_filter,
    }))
}

async fn update_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<UpdateStatusForm>,
) -> Result<HttpResponse> {
    let Some(session) = admin_session(&state, &req).await else {
        return Ok(HttpResponse::Forbidden().json(json!({ "error": "Unauthorized" })));
    };
    let form = form.into_inner();

    let (Some(appointment_id), Some(raw_status)) = (form.appointment_id, form.status) else {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "Missing data" })));
    };
    let Some(status) = AppointmentStatus::parse(&raw_status) else {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "Invalid status" })));
    };

    db::set_appointment_status(&state.db, appointment_id, status.as_str())
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    log::info!(
        "{} set appointment {appointment_id} to {status}",
        session.username
    );

    Ok(redirect("/admin"))
}

async fn delete_appointment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let Some(session) = admin_session(&state, &req).await else {
        return Ok(redirect("/login"));
    };
    let appointment_id = path.into_inner();

    let removed = db::delete_appointment(&state.db, appointment_id)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    if removed > 0 {
        log::info!("{} deleted appointment {appointment_id}", session.username);
    }

    Ok(redirect("/admin"))
}

async fn reviews(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    if admin_session(&state, &req).await.is_none() {
        return Ok(redirect("/login"));
    }

    let reviews = db::all_reviews(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(ReviewView::from_row)
        .collect();

    Ok(render(AdminReviewsTemplate { reviews }))
}

async fn users(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    if admin_session(&state, &req).await.is_none() {
        return Ok(redirect("/login"));
    }

    let users = db::list_users(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|user| UserView {
            id: user.id,
            username: user.username,
            role: user.role,
        })
        .collect();

    Ok(render(AdminUsersTemplate { users }))
}
