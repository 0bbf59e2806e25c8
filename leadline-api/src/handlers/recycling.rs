use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::UpdateRecyclePolicyRequest;
use std::sync::Arc;

use crate::engine::Engine;

pub async fn get_policy(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let policy = engine.recycling.get_policy(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(policy))
}

pub async fn update_policy(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
    request: web::Json<UpdateRecyclePolicyRequest>,
) -> ActixResult<HttpResponse> {
    let policy = engine
        .recycling
        .update_policy(path.into_inner(), &request)
        .await?;

    Ok(HttpResponse::Ok().json(policy))
}

pub async fn recycle_now(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let response = engine.recycling.recycle_now(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(response))
}
