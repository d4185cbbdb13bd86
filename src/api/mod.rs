pub mod auth;
pub mod health;
pub mod reservations;
pub mod spaces;
pub mod swagger;
pub mod users;

use actix_web::web;

use crate::middleware::IdentityMiddleware;
use crate::utils::error::AppError;

/// Mounts every `/api/v1` route. Malformed JSON bodies and query strings are
/// answered with the same `InvalidInput` envelope as validation failures.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1")
            .wrap(IdentityMiddleware)
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::get_me)),
            )
            .service(
                web::scope("/users")
                    .route("", web::get().to(users::list_users))
                    .route("/{id}", web::get().to(users::get_user)),
            )
            .service(
                web::scope("/spaces")
                    .route("", web::get().to(spaces::list_spaces))
                    .route("", web::post().to(spaces::create_space))
                    .route("/{id}", web::get().to(spaces::get_space))
                    .route("/{id}", web::put().to(spaces::update_space))
                    .route("/{id}", web::delete().to(spaces::deactivate_space))
                    .route("/{id}/availability", web::get().to(spaces::check_availability))
                    .route("/{id}/reservations", web::get().to(spaces::space_reservations))
                    .route("/{id}/occupancy", web::get().to(spaces::space_occupancy))
                    .route("/{id}/quote", web::get().to(spaces::quote)),
            )
            .service(
                web::scope("/reservations")
                    .route("", web::post().to(reservations::create_reservation))
                    // must stay ahead of /{id}
                    .route("/mine", web::get().to(reservations::my_reservations))
                    .route("/{id}", web::get().to(reservations::get_reservation))
                    .route("/{id}/status", web::patch().to(reservations::update_status))
                    .route("/{id}/cancel", web::post().to(reservations::cancel_reservation)),
            ),
    );
}
