use actix_web::{web, HttpRequest, HttpResponse, Result};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{
        authenticate_credentials, clear_session_cookie, current_session, hash_password,
        session_cookie,
    },
    db,
    filters,
    models::{ReviewRow, Role},
    state::AppState,
    templates::{redirect, render},
};

#[derive(Clone, Debug)]
pub struct ReviewView {
    pub name: String,
    pub rating: i64,
    pub comment: String,
    pub posted_on: String,
}

impl ReviewView {
    pub fn from_row(row: ReviewRow) -> Self {
        ReviewView {
            name: row.name.unwrap_or_else(|| "Anonymous".to_string()),
            rating: row.rating.unwrap_or(0),
            comment: row.comment.unwrap_or_default(),
            posted_on: row.created_at.chars().take(10).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceOption {
    pub name: &'static str,
    pub duration: &'static str,
    pub description: &'static str,
    pub price: f64,
}

pub fn service_catalog() -> Vec<ServiceOption> {
    vec![
        ServiceOption {
            name: "Haircut & Style",
            duration: "45 min",
            description: "Wash, precision cut, and blow-dry finish.",
            price: 35.0,
        },
        ServiceOption {
            name: "Hair Coloring",
            duration: "90 min",
            description: "Full color or highlights with gloss treatment.",
            price: 80.0,
        },
        ServiceOption {
            name: "Manicure",
            duration: "30 min",
            description: "Shape, cuticle care, and polish.",
            price: 25.0,
        },
        ServiceOption {
            name: "Pedicure",
            duration: "40 min",
            description: "Soak, exfoliation, and polish.",
            price: 30.0,
        },
        ServiceOption {
            name: "Facial",
            duration: "50 min",
            description: "Deep cleanse, massage, and hydrating mask.",
            price: 45.0,
        },
        ServiceOption {
            name: "Bridal Package",
            duration: "150 min",
            description: "Hair, makeup, and nails for the big day.",
            price: 180.0,
        },
    ]
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    reviews: Vec<ReviewView>,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    error: String,
    has_error: bool,
    username: String,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: String,
    has_error: bool,
    username: String,
}

#[derive(Template)]
#[template(path = "avail.html")]
struct AvailTemplate {
    services: Vec<ServiceOption>,
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(
            web::resource("/register")
                .route(web::get().to(show_register))
                .route(web::post().to(register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(show_login))
                .route(web::post().to(login)),
        )
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(web::resource("/avail").route(web::get().to(avail)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn home(state: web::Data<AppState>) -> Result<HttpResponse> {
    let reviews = db::all_reviews(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(ReviewView::from_row)
        .collect();

    Ok(render(HomeTemplate { reviews }))
}

async fn show_register() -> HttpResponse {
    render(RegisterTemplate {
        error: String::new(),
        has_error: false,
        username: String::new(),
    })
}

async fn register(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let username = form.username.trim().to_string();

    if username.is_empty() || form.password.is_empty() {
        return Ok(register_error(
            "Please provide a username and password.",
            &username,
        ));
    }

    let taken = db::find_user_by_username(&state.db, &username)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?
        .is_some();
    if taken {
        return Ok(register_error("Username already taken.", &username));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| actix_web::error::ErrorInternalServerError("hash failure"))?;

    // the unique index still backstops a concurrent registration
    if db::create_user(&state.db, &username, &password_hash, Role::Customer)
        .await
        .is_err()
    {
        return Ok(register_error(
            "Could not create user. Try a different username.",
            &username,
        ));
    }

    log::info!("New customer registered: {username}");

    // auto-login after registration
    let Some(user) = db::find_user_by_username(&state.db, &username)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?
    else {
        return Ok(redirect("/login"));
    };
    let session = db::create_session(&state.db, &user)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((actix_web::http::header::LOCATION, "/"))
        .cookie(session_cookie(&req, &session.id))
        .finish())
}

fn register_error(message: &str, username: &str) -> HttpResponse {
    render(RegisterTemplate {
        error: message.to_string(),
        has_error: true,
        username: username.to_string(),
    })
}

async fn show_login() -> HttpResponse {
    render(LoginTemplate {
        error: String::new(),
        has_error: false,
        username: String::new(),
    })
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let username = form.username.trim();

    let Some(session) = authenticate_credentials(&state, username, &form.password).await else {
        return Ok(render(LoginTemplate {
            error: "Invalid username or password".to_string(),
            has_error: true,
            username: username.to_string(),
        }));
    };

    let target = if session.is_admin() { "/admin" } else { "/" };

    Ok(HttpResponse::SeeOther()
        .append_header((actix_web::http::header::LOCATION, target))
        .cookie(session_cookie(&req, &session.id))
        .finish())
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(session) = current_session(&state, &req).await {
        if let Err(err) = db::delete_session(&state.db, &session.id).await {
            log::warn!("Failed to drop session {}: {err}", session.id);
        }
    }

    HttpResponse::SeeOther()
        .append_header((actix_web::http::header::LOCATION, "/login"))
        .cookie(clear_session_cookie(&req))
        .finish()
}

async fn avail(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if current_session(&state, &req).await.is_none() {
        return redirect("/login");
    }

    render(AvailTemplate {
        services: service_catalog(),
    })
}
