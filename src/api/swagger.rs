use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coworking Booking API",
        version = "1.0.0",
        description = "Reservation API for a coworking space. \n\n**Authentication:** Most endpoints require a JWT Bearer token obtained from `/api/v1/auth/login`.\n\n**Roles:** members book and cancel their own reservations; admins manage spaces, users and reservation status."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_me,

        // Users
        crate::api::users::list_users,
        crate::api::users::get_user,

        // Health
        crate::api::health::health_check,

        // Spaces
        crate::api::spaces::list_spaces,
        crate::api::spaces::get_space,
        crate::api::spaces::create_space,
        crate::api::spaces::update_space,
        crate::api::spaces::deactivate_space,
        crate::api::spaces::check_availability,
        crate::api::spaces::space_reservations,
        crate::api::spaces::space_occupancy,
        crate::api::spaces::quote,

        // Reservations
        crate::api::reservations::my_reservations,
        crate::api::reservations::get_reservation,
        crate::api::reservations::create_reservation,
        crate::api::reservations::update_status,
        crate::api::reservations::cancel_reservation,
    ),
    components(
        schemas(
            crate::models::Role,
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::AuthResponse,
            crate::models::UserInfo,

            crate::models::SpaceType,
            crate::models::CreateSpaceRequest,
            crate::models::UpdateSpaceRequest,
            crate::models::SpaceResponse,

            crate::models::ReservationStatus,
            crate::models::CreateReservationRequest,
            crate::models::UpdateStatusRequest,
            crate::models::ReservationResponse,
            crate::services::analytics_service::OccupancyStats,

            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and the current identity."),
        (name = "Users", description = "User directory (admin only)."),
        (name = "Health", description = "Liveness and store connectivity."),
        (name = "Spaces", description = "Space catalog, availability, occupancy and quotes."),
        (name = "Reservations", description = "Booking, cancellation and status management."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/v1/auth/login"))
                        .build()
                ),
            );
        }
    }
}
