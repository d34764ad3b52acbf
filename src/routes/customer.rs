use actix_web::{web, HttpRequest, HttpResponse, Result};
use askama::Template;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::current_session,
    db,
    filters,
    models::{CartItem, NewAppointment, SessionRow},
    routes::public::{service_catalog, ReviewView, ServiceOption},
    settle::{self, SettledAppointment},
    state::AppState,
    templates::{redirect, render},
};

#[derive(Clone, Debug)]
struct HistoryEntry {
    service: String,
    appointment_time: String,
    status: String,
    cart: Vec<CartItem>,
    total: f64,
}

impl HistoryEntry {
    fn from_settled(appt: SettledAppointment) -> Self {
        HistoryEntry {
            service: appt.service,
            appointment_time: appt.appointment_time,
            status: appt.status.to_string(),
            cart: appt.cart,
            total: appt.total,
        }
    }
}

#[derive(Template)]
#[template(path = "booking.html")]
struct BookingTemplate {
    username: String,
    services: Vec<ServiceOption>,
    cart: Vec<CartItem>,
    total: f64,
    errors: Vec<String>,
    has_errors: bool,
}

#[derive(Template)]
#[template(path = "receipt.html")]
struct ReceiptTemplate {
    name: String,
    phone: String,
    gender: String,
    service: String,
    appointment_time: String,
    message: String,
    cart: Vec<CartItem>,
    total: f64,
}

#[derive(Template)]
#[template(path = "history.html")]
struct HistoryTemplate {
    appointments: Vec<HistoryEntry>,
}

#[derive(Template)]
#[template(path = "add_review.html")]
struct AddReviewTemplate {
    reviews: Vec<ReviewView>,
}

#[derive(Deserialize)]
struct BookingForm {
    name: String,
    phone: String,
    gender: Option<String>,
    service: Option<String>,
    #[serde(rename = "meeting-time")]
    meeting_time: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SaveCartPayload {
    #[serde(default)]
    cart: Vec<CartItem>,
    #[serde(default)]
    total: f64,
}

#[derive(Deserialize)]
struct ReviewForm {
    name: Option<String>,
    rating: Option<i64>,
    comment: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/form")
            .route(web::get().to(show_booking))
            .route(web::post().to(create_booking)),
    )
    .service(web::resource("/save_cart").route(web::post().to(save_cart)))
    .service(web::resource("/customer/history").route(web::get().to(booking_history)))
    .service(
        web::resource("/add_review")
            .route(web::get().to(show_reviews))
            .route(web::post().to(create_review)),
    );
}

async fn show_booking(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let Some(session) = current_session(&state, &req).await else {
        return Ok(redirect("/login"));
    };

    Ok(render(booking_page(&session, Vec::new())))
}

fn booking_page(session: &SessionRow, errors: Vec<String>) -> BookingTemplate {
    BookingTemplate {
        username: session.username.clone(),
        services: service_catalog(),
        cart: settle::decode_cart(Some(session.cart.as_str())),
        total: session.total,
        has_errors: !errors.is_empty(),
        errors,
    }
}

async fn create_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<BookingForm>,
) -> Result<HttpResponse> {
    let Some(session) = current_session(&state, &req).await else {
        return Ok(redirect("/login"));
    };
    let form = form.into_inner();

    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Full name is required.".to_string());
    }
    if form.phone.trim().is_empty() {
        errors.push("Phone number is required.".to_string());
    }
    if !errors.is_empty() {
        return Ok(render(booking_page(&session, errors)));
    }

    let booking = NewAppointment {
        customer_id: Some(session.user_id),
        name: form.name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        gender: form.gender.filter(|value| !value.trim().is_empty()),
        service: form.service.filter(|value| !value.trim().is_empty()),
        appointment_time: form.meeting_time.filter(|value| !value.trim().is_empty()),
        message: form.message.filter(|value| !value.trim().is_empty()),
        cart_json: session.cart.clone(),
        total: session.total,
    };

    let appointment_id = db::insert_appointment(&state.db, &booking)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    log::info!(
        "Appointment {appointment_id} booked by {} for {}",
        session.username,
        booking.appointment_time.as_deref().unwrap_or("unscheduled")
    );

    // booking consumed the cart
    if let Err(err) = db::update_session_cart(&state.db, &session.id, "[]", 0.0).await {
        log::warn!("Failed to clear cart on session {}: {err}", session.id);
    }

    Ok(render(ReceiptTemplate {
        name: booking.name,
        phone: booking.phone,
        gender: booking.gender.unwrap_or_default(),
        service: booking.service.unwrap_or_default(),
        appointment_time: booking.appointment_time.unwrap_or_default(),
        message: booking.message.unwrap_or_default(),
        cart: settle::decode_cart(Some(session.cart.as_str())),
        total: session.total,
    }))
}

async fn save_cart(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<SaveCartPayload>,
) -> Result<HttpResponse> {
    let Some(session) = current_session(&state, &req).await else {
        return Ok(HttpResponse::Unauthorized().json(json!({ "error": "Login required" })));
    };

    let payload = payload.into_inner();
    let cart_json = serde_json::to_string(&payload.cart)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    db::update_session_cart(&state.db, &session.id, &cart_json, payload.total)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Cart saved successfully" })))
}

async fn booking_history(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let Some(session) = current_session(&state, &req).await else {
        return Ok(redirect("/login"));
    };

    let rows = db::appointments_for_customer(&state.db, session.user_id)
        .await
        .unwrap_or_default();
    let settled = settle::normalize(rows, Local::now().naive_local());

    for appt in settled.iter().filter(|appt| appt.changed) {
        if let Err(err) = db::complete_if_open(&state.db, appt.id).await {
            log::warn!("Failed to settle appointment {}: {err}", appt.id);
        }
    }

    let appointments = settled.into_iter().map(HistoryEntry::from_settled).collect();

    Ok(render(HistoryTemplate { appointments }))
}

async fn show_reviews(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    if current_session(&state, &req).await.is_none() {
        return Ok(redirect("/login"));
    }

    let reviews = db::all_reviews(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(ReviewView::from_row)
        .collect();

    Ok(render(AddReviewTemplate { reviews }))
}

async fn create_review(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<ReviewForm>,
) -> Result<HttpResponse> {
    let Some(session) = current_session(&state, &req).await else {
        return Ok(redirect("/login"));
    };
    let form = form.into_inner();

    let name = form
        .name
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| session.username.clone());
    let rating = form.rating.map(|value| value.clamp(1, 5));

    db::insert_review(
        &state.db,
        Some(session.user_id),
        Some(name.trim()),
        rating,
        form.comment.as_deref(),
    )
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/add_review"))
}
