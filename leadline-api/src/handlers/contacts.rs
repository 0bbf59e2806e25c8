use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{CallsResponse, ContactsResponse, CreateContactRequest, ListContactsQuery};
use std::sync::Arc;

use crate::database::{calls as calls_db, contacts as contacts_db};
use crate::engine::Engine;

pub async fn list_contacts(
    engine: web::Data<Arc<Engine>>,
    query: web::Query<ListContactsQuery>,
) -> ActixResult<HttpResponse> {
    let contacts = contacts_db::list(engine.db_conn(), &query).await?;

    Ok(HttpResponse::Ok().json(ContactsResponse { contacts }))
}

pub async fn create_contact(
    engine: web::Data<Arc<Engine>>,
    request: web::Json<CreateContactRequest>,
) -> ActixResult<HttpResponse> {
    let contact = engine.create_contact(&request).await?;

    Ok(HttpResponse::Created().json(contact))
}

pub async fn get_contact(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let contact = contacts_db::fetch(engine.db_conn(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(contact))
}

pub async fn delete_contact(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    engine.delete_contact(path.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_contact_calls(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let calls = calls_db::list_calls(engine.db_conn(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(CallsResponse { calls }))
}
