use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::auth::{login, logout, register};
use crate::error::json_error_handler;
use crate::middleware::Authentication;
use crate::todo::{
    create_todo, delete_todo, list_deleted_todos, list_todos, purge_todo, restore_todo,
    update_todo,
};

// GET /api/health
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Server is running" }))
}

/// Mounts the whole `/api` tree. Expects `web::Data<AppState>` to be
/// registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health))
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(register))
                        .route("/login", web::post().to(login))
                        .route("/logout", web::post().to(logout)),
                )
                .service(
                    web::scope("/todos")
                        .wrap(Authentication)
                        .route("", web::get().to(list_todos))
                        .route("", web::post().to(create_todo))
                        .route("/deleted/list", web::get().to(list_deleted_todos))
                        .route("/{id}", web::put().to(update_todo))
                        .route("/{id}", web::delete().to(delete_todo))
                        .route("/{id}/restore", web::put().to(restore_todo))
                        .route("/{id}/permanent", web::delete().to(purge_todo)),
                ),
        );
}
