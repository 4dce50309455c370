use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use todo_list::db::MongoDB;
use todo_list::{routes, AppState, Config};

fn cors(config: &Config) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .max_age(3600);

    if config.allows_any_origin() {
        return cors.allow_any_origin();
    }
    config
        .frontend_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    let mongodb = match MongoDB::init(&config.mongo_uri, &config.database_name).await {
        Ok(db) => db,
        Err(e) => {
            error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    };
    let state = web::Data::new(AppState::with_mongo(config.clone(), &mongodb));

    let (host, port) = config.bind_address();
    info!("Server running at http://{}:{}", host, port);
    info!("Allowed CORS origins: {}", config.frontend_origins.join(", "));

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&config))
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
