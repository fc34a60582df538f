use std::fs;

use actix_files::Files;
use actix_web::{middleware, App, HttpServer};

use inkflow::{
    db,
    state::{AppState, StudioConfig},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = StudioConfig::from_env();
    db::ensure_sqlite_dir(&config.database_url)?;
    fs::create_dir_all(&config.upload_dir)?;

    let pool = db::connect(&config.database_url, 5).await?;
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool, &config).await?;

    let serves_frontend = config.serves_frontend();
    if !serves_frontend {
        log::info!(
            "No front-end bundle in {}, serving the API only",
            config.static_dir.display()
        );
    }

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState { db: pool, config };
    log::info!("Starting InkFlow on http://{address}");

    HttpServer::new(move || {
        let app = App::new()
            .wrap(inkflow::cors_headers())
            .wrap(middleware::Logger::default())
            .configure(inkflow::configure(state.clone()))
            .service(Files::new("/uploads", state.config.upload_dir.clone()));
        if serves_frontend {
            app.service(Files::new("/", state.config.static_dir.clone()).index_file("index.html"))
        } else {
            app
        }
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
