use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        appointments::{AppointmentList, AppointmentWithService},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        services::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
    },
    models::{Appointment, AppointmentStatus, Role, Service, User},
    response::{ApiResponse, Meta},
    routes::{appointments, auth, health, params, services},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        auth::me,
        services::list_services,
        services::get_service,
        services::create_service,
        services::update_service,
        services::delete_service,
        appointments::book_appointment,
        appointments::list_appointments,
        appointments::cancel_appointment,
        appointments::update_appointment_status,
    ),
    components(
        schemas(
            User,
            Role,
            Service,
            Appointment,
            AppointmentStatus,
            AppointmentWithService,
            AppointmentList,
            ServiceList,
            CreateServiceRequest,
            UpdateServiceRequest,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            params::Pagination,
            Meta,
            ApiResponse<Service>,
            ApiResponse<ServiceList>,
            ApiResponse<Appointment>,
            ApiResponse<AppointmentList>,
            ApiResponse<User>,
            ApiResponse<LoginResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Services", description = "Service catalog endpoints"),
        (name = "Appointments", description = "Booking and lifecycle endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
