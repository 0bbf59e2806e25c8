use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{LogCallRequest, RenameResponse};
use std::sync::Arc;

use crate::database::calls as calls_db;
use crate::engine::Engine;

pub async fn log_call(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<LogCallRequest>,
) -> ActixResult<HttpResponse> {
    let call = calls_db::log_call(engine.db_conn(), &request, engine.now()).await?;
    tracing::info!(
        "Logged call {} for contact {} ({})",
        call.id,
        call.contact_id,
        call.recording_status.as_str()
    );

    Ok(HttpResponse::Created().json(call))
}

pub async fn rename_recording(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let call_id = path.into_inner();
    let file_name = engine.renamer.rename(call_id).await?;

    Ok(HttpResponse::Ok().json(RenameResponse { call_id, file_name }))
}
