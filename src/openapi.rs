use utoipa::OpenApi;

use crate::models::{
    CatalogState, CatalogView, ClassListing, Notice, NoticeVariant, RegistrationForm,
    ScheduleRequestForm,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_classes,
        crate::handlers::create_registration,
        crate::handlers::get_class_menu,
        crate::handlers::create_schedule_request
    ),
    components(schemas(
        ClassListing,
        CatalogState,
        CatalogView,
        Notice,
        NoticeVariant,
        RegistrationForm,
        ScheduleRequestForm
    )),
    tags(
        (name = "booking", description = "Baking class catalog and registration")
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_booking_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/classes"));
        assert!(doc.paths.paths.contains_key("/registrations"));
        assert!(doc.paths.paths.contains_key("/schedule-requests"));
    }
}
