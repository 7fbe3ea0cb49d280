//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST handler, the domain error schemas and
//! the bearer security scheme. Swagger UI serves it in debug builds and
//! `cargo run --bin openapi-dump` prints it for client tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// Name of the bearer scheme referenced by protected handlers.
pub const BEARER_SCHEME: &str = "bearer";

/// Enrich the generated document with the JWT bearer security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token returned by POST /api/signup or /api/login."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Alertline API",
        description = "Community incident reports, one-time passcodes, engagement and notifications.",
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::accounts::signup,
        crate::inbound::http::accounts::login,
        crate::inbound::http::accounts::request_otp,
        crate::inbound::http::accounts::verify_otp,
        crate::inbound::http::accounts::reset_password,
        crate::inbound::http::accounts::resend_otp,
        crate::inbound::http::accounts::otp_status,
        crate::inbound::http::alerts::post_alert,
        crate::inbound::http::alerts::feed,
        crate::inbound::http::alert_actions::toggle_like,
        crate::inbound::http::alert_actions::flag,
        crate::inbound::http::alert_actions::share,
        crate::inbound::http::notifications::list,
        crate::inbound::http::notifications::mark_read,
        crate::inbound::http::notifications::remove,
        crate::inbound::http::notifications::broadcast,
        crate::inbound::http::notifications::show_less,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "accounts", description = "Signup, login and one-time passcodes"),
        (name = "alerts", description = "Posting and browsing incident alerts"),
        (name = "alert actions", description = "Likes, flags and shares"),
        (name = "notifications", description = "Per-user notifications"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
