//! HTTP handlers and route configuration.

mod auth;
mod blogs;
mod health;


use actix_web::{HttpRequest, error, web};

use crate::middleware::error::AppError;
use crate::state::AppState;

#[cfg(feature = "rate-limit")]
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let auth = web::scope("/auth")
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/me", web::get().to(auth::me));

    #[cfg(feature = "rate-limit")]
    let auth = auth.wrap(RateLimitMiddleware::new(state.auth_limiter.clone()));
    #[cfg(not(feature = "rate-limit"))]
    let _ = state;

    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(
            web::scope("/api")
                // Public routes
                .route("/health", web::get().to(health::health_check))
                .service(auth)
                .service(
                    web::scope("/blogs")
                        .service(
                            web::resource("")
                                .route(web::get().to(blogs::list))
                                .route(web::post().to(blogs::create)),
                        )
                        // Must precede `/{id}`
                        .route("/my-blogs", web::get().to(blogs::my_blogs))
                        .route("/publish/{id}", web::patch().to(blogs::publish))
                        .service(
                            web::resource("/{id}")
                                .route(web::get().to(blogs::read))
                                .route(web::put().to(blogs::update))
                                .route(web::delete().to(blogs::delete)),
                        ),
                ),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::BadRequest(format!("Invalid JSON body: {err}")).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req| {
        AppError::BadRequest(format!("Invalid query string: {err}")).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::BadRequest("Invalid blog id".to_string()).into())
}
