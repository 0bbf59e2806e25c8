use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{
    CreateAgentRequest, CreateAssignmentRequest, CreateCampaignRequest, CreateSourceDatabaseRequest,
};
use std::sync::Arc;

use crate::database::{agents, source_databases};
use crate::engine::Engine;

pub async fn create_agent(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<CreateAgentRequest>,
) -> ActixResult<HttpResponse> {
    let agent = agents::create_agent(engine.db_conn(), &request, engine.now()).await?;
    tracing::info!("Created agent {} ({:?})", agent.id, agent.role);

    Ok(HttpResponse::Created().json(agent))
}

pub async fn create_assignment(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
    request: web::Json<CreateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    let agent_id = path.into_inner();
    let assignment =
        agents::create_assignment(engine.db_conn(), agent_id, &request, engine.now()).await?;

    Ok(HttpResponse::Created().json(assignment))
}

pub async fn create_source_database(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<CreateSourceDatabaseRequest>,
) -> ActixResult<HttpResponse> {
    let source_database =
        source_databases::create_source_database(engine.db_conn(), &request, engine.now()).await?;

    Ok(HttpResponse::Created().json(source_database))
}

pub async fn create_campaign(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<CreateCampaignRequest>,
) -> ActixResult<HttpResponse> {
    let campaign =
        source_databases::create_campaign(engine.db_conn(), &request, engine.now()).await?;

    Ok(HttpResponse::Created().json(campaign))
}
