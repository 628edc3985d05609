mod config;
mod models;
mod handlers;
mod services;
mod tasks;

use std::sync::Arc;

use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_cors::Cors;
use dotenv::dotenv;

use services::{
    database::DatabaseService,
    dispatcher::EmailDispatcher,
    milestones::MilestoneCalculator,
    scanner::ExpiryScanner,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env();
    let calculator = MilestoneCalculator::with_catch_up(config.scan.catch_up_days);

    // Initialize database service
    let database_service = DatabaseService::new(&config.database, calculator.clone()).await
        .expect("Failed to initialize database");
    let database = Arc::new(database_service.clone());

    let dispatcher = EmailDispatcher::from_config(&config.mail);
    if !dispatcher.is_configured() {
        log::warn!("⚠️ EMAIL/EMAIL_PASS not set; reminders will be recorded but not emailed");
    }

    let scanner = Arc::new(ExpiryScanner::new(
        database.clone(),
        database,
        Arc::new(dispatcher),
        calculator,
        config.scan.clone(),
    ));

    // One-shot mode for cron
    if std::env::args().nth(1).as_deref() == Some("scan") {
        return match tasks::expiry_scan::run_expiry_scan(&scanner).await {
            Ok(_) => Ok(()),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        };
    }

    let periodic_scan = tasks::expiry_scan::spawn_periodic_scan(scanner.clone());

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("🚀 Starting Expiry Tracker on {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials()
            )
            .app_data(web::Data::new(database_service.clone()))
            .app_data(web::Data::from(scanner.clone()))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(handlers::health::health_check))
                    .service(handlers::scan::trigger_scan)
                    // Notifications
                    .service(
                        web::scope("/notifications")
                            .service(handlers::notifications::list_unread_notifications)
                            .service(handlers::notifications::list_notifications)
                            .service(handlers::notifications::create_notification)
                            .service(handlers::notifications::mark_notification_read)
                            .service(handlers::notifications::delete_notification)
                    )
                    // Tracked items
                    .service(
                        web::scope("/registrars")
                            .service(handlers::items::list_registrars)
                            .service(handlers::items::create_registrar)
                            .service(handlers::items::get_registrar)
                            .service(handlers::items::update_registrar)
                            .service(handlers::items::delete_registrar)
                    )
                    .service(
                        web::scope("/domains")
                            .service(handlers::items::list_domains)
                            .service(handlers::items::create_domain)
                            .service(handlers::items::list_expiring_domains)
                            .service(handlers::items::get_domain)
                            .service(handlers::items::update_domain)
                            .service(handlers::items::complete_domain)
                            .service(handlers::items::delete_domain)
                    )
                    .service(
                        web::scope("/ssl-certificates")
                            .service(handlers::items::list_ssl_certificates)
                            .service(handlers::items::create_ssl_certificate)
                            .service(handlers::items::list_expiring_ssl_certificates)
                            .service(handlers::items::get_ssl_certificate)
                            .service(handlers::items::update_ssl_certificate)
                            .service(handlers::items::complete_ssl_certificate)
                            .service(handlers::items::delete_ssl_certificate)
                    )
                    .service(
                        web::scope("/dashboard")
                            .service(handlers::dashboard::get_stats)
                    )
            )
    })
    .bind(&bind_address)?
    .run()
    .await;

    if let Some(handle) = periodic_scan {
        handle.abort();
    }

    server
}
