use actix_web::{web, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::engine::Engine;

/// `200` with the claimed contact, `204` when there is no work.
pub async fn next_contact(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let agent_id = path.into_inner();

    match engine.dispatcher.next_contact(agent_id).await? {
        Some(contact) => Ok(HttpResponse::Ok().json(contact)),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}
