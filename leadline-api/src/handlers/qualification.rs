use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::QualifyRequest;
use std::sync::Arc;

use crate::engine::Engine;

pub async fn qualify(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<QualifyRequest>,
) -> ActixResult<HttpResponse> {
    let response = engine.qualifier.qualify(&request).await?;

    Ok(HttpResponse::Ok().json(response))
}
