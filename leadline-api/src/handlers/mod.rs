pub mod admin;
pub mod calls;
pub mod contacts;
pub mod dispatch;
pub mod qualification;
pub mod recycling;

use actix_web::web;

/// Mounts the `/api` routes. Handlers expect `web::Data<Arc<Engine>>`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/agents", web::post().to(admin::create_agent))
        .route("/api/agents/{id}/assignments", web::post().to(admin::create_assignment))
        .route("/api/agents/{id}/next-contact", web::post().to(dispatch::next_contact))
        .route("/api/source-databases", web::post().to(admin::create_source_database))
        .route("/api/source-databases/{id}/recycle-policy", web::get().to(recycling::get_policy))
        .route("/api/source-databases/{id}/recycle-policy", web::put().to(recycling::update_policy))
        .route("/api/source-databases/{id}/recycle", web::post().to(recycling::recycle_now))
        .route("/api/campaigns", web::post().to(admin::create_campaign))
        .route("/api/contacts", web::get().to(contacts::list_contacts))
        .route("/api/contacts", web::post().to(contacts::create_contact))
        .route("/api/contacts/{id}", web::get().to(contacts::get_contact))
        .route("/api/contacts/{id}", web::delete().to(contacts::delete_contact))
        .route("/api/contacts/{id}/calls", web::get().to(contacts::list_contact_calls))
        .route("/api/calls", web::post().to(calls::log_call))
        .route("/api/calls/{id}/rename", web::post().to(calls::rename_recording))
        .route("/api/qualifications", web::post().to(qualification::qualify));
}
