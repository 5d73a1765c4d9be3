use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use blogfolio_backend::{
    build_pool,
    config::Config,
    middleware::RedirectWwwToNaked,
    routes,
    setup::db_setup,
};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "blogfolio_server",
    author,
    version,
    about = "Starts the blog and portfolio API server."
)]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

fn build_cors(config: &Config) -> Cors {
    let allowed = config.cors_origins.trim();
    let base = if allowed == "*" {
        Cors::default().allow_any_origin()
    } else {
        let mut cors = Cors::default();
        for origin in allowed.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            cors = cors.allowed_origin(origin);
        }
        cors
    };
    base.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(cli.env_file.as_deref())
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    fs::create_dir_all(&config.database_path).expect("Failed to create database directory");
    fs::create_dir_all(config.upload_root()).expect("Failed to create upload directory");

    let pool = build_pool(&config.db_file())
        .expect("FATAL: Failed to create SQLite connection pool.");

    db_setup::initialize(&pool, &config)
        .expect("FATAL: Database initialization failed.");

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    let upload_root = config.upload_root();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config))
            .wrap(Logger::default())
            .wrap(RedirectWwwToNaked::from_config(&config))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(pool.clone()))
            .configure(routes::configure_api)
            .service(actix_files::Files::new("/static/uploads", &upload_root))
    })
    .bind(server_address)?
    .run()
    .await
}
