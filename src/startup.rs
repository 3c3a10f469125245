use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::TcpListener, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{DatabaseSettings, QdrantSettings, Settings},
    controllers::{create_account, log_in_account},
    domain::services::{
        content_ingestion::ContentIngestionService,
        content_retrieval::ContentRetrievalService,
        gemini_ai::{GeminiAiService, GeminiAiServiceError},
        page_scraper::{PageScraperService, PageScraperServiceError},
    },
    middlewares::jwt_authentication::RequireAuth,
    repositories::{
        content_postgres_repository::ContentPostgresRepository,
        jwt_authentication_repository::JwtAuthenticationRepository,
        share_link_postgres_repository::ShareLinkPostgresRepository,
        user_postgres_repository::UserPostgresRepository,
        vector_record_qdrant_repository::{
            VectorRecordQdrantRepository, VectorRecordQdrantRepositoryError,
        },
    },
    routes::{
        add_content, delete_content, health_check, list_contents, search_content, share_brain,
        shared_brain,
    },
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Error from the Qdrant client: {0}")]
    QdrantClientError(String),
    #[error(transparent)]
    VectorRecordQdrantRepositoryError(#[from] VectorRecordQdrantRepositoryError),
    #[error(transparent)]
    GeminiAiServiceError(#[from] GeminiAiServiceError),
    #[error(transparent)]
    PageScraperServiceError(#[from] PageScraperServiceError),
}

impl Application {
    /// Builds every process-lifetime collaborator exactly once: the connection
    /// pool, the vector-index client, the generative AI client and the page
    /// scraper are created here and handed to the request handlers by
    /// reference, never as mutable globals.
    ///
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application", skip(settings))]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let connection_pool = get_connection_pool(&settings.database);

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();

        let qdrant_client = get_qdrant_client(&settings.qdrant)?;
        let vector_repository = Arc::new(
            VectorRecordQdrantRepository::try_new(
                qdrant_client,
                &settings.qdrant.collection,
                &settings.qdrant.collection_distance,
                settings.qdrant.collection_vector_size,
            )
            .await?,
        );

        let ai_service = Arc::new(GeminiAiService::try_new(&settings.generative_ai)?);
        let scraper_service = Arc::new(PageScraperService::try_new(&settings.scraper)?);

        let content_repository = Arc::new(ContentPostgresRepository::new());
        let user_repository = UserPostgresRepository::new();
        let share_link_repository = ShareLinkPostgresRepository::new();
        let auth_repository = JwtAuthenticationRepository::new(
            settings.auth.jwt_secret.clone(),
            settings.auth.jwt_expire_in_s,
        );

        let ingestion_service = ContentIngestionService::new(
            connection_pool.clone(),
            scraper_service,
            ai_service.clone(),
            content_repository.clone(),
            vector_repository.clone(),
        );
        let retrieval_service = ContentRetrievalService::new(
            connection_pool.clone(),
            ai_service,
            content_repository.clone(),
            vector_repository,
        );

        let server = run(
            listener,
            nb_workers,
            connection_pool,
            ingestion_service,
            retrieval_service,
            content_repository,
            user_repository,
            share_link_repository,
            auth_repository,
        )?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    db_pool: PgPool,
    ingestion_service: ContentIngestionService,
    retrieval_service: ContentRetrievalService,
    content_repository: Arc<ContentPostgresRepository>,
    user_repository: UserPostgresRepository,
    share_link_repository: ShareLinkPostgresRepository,
    auth_repository: JwtAuthenticationRepository,
) -> Result<Server, std::io::Error> {
    // Wraps the connection pool and the shared services in `actix_web::Data`
    // (`Arc`) to register them and access them from handlers.
    let db_pool = Data::new(db_pool);
    let ingestion_service = Data::new(ingestion_service);
    let retrieval_service = Data::new(retrieval_service);
    // Same instance as the one held by the orchestrator services
    let content_repository = Data::from(content_repository);
    let user_repository = Data::new(user_repository);
    let share_link_repository = Data::new(share_link_repository);
    let auth_repository = Data::new(auth_repository);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/signup", web::post().to(create_account))
            .route("/signin", web::post().to(log_in_account))
            // Registered before the public capability route: /brain/share must
            // resolve to the authenticated resource, not to the `{share_link}`
            // pattern below it
            .service(
                web::resource("/brain/share")
                    .wrap(RequireAuth::new(auth_repository.clone()))
                    .route(web::post().to(share_brain)),
            )
            // Public: the opaque hash is the capability
            .route("/brain/{share_link}", web::get().to(shared_brain))
            .service(
                web::scope("/content")
                    .wrap(RequireAuth::new(auth_repository.clone()))
                    .route("", web::post().to(add_content))
                    .route("", web::get().to(list_contents))
                    .route("/{content_id}", web::delete().to(delete_content)),
            )
            .service(
                web::resource("/search")
                    .wrap(RequireAuth::new(auth_repository.clone()))
                    .route(web::post().to(search_content)),
            )
            .app_data(db_pool.clone())
            .app_data(ingestion_service.clone())
            .app_data(retrieval_service.clone())
            .app_data(content_repository.clone())
            .app_data(user_repository.clone())
            .app_data(share_link_repository.clone())
            .app_data(auth_repository.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(settings.with_db())
}

/// Sets up a client to Qdrant
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<QdrantClient, ApplicationBuildError> {
    let qdrant_config = QdrantClientConfig::from_url(&config.get_grpc_base_url());
    QdrantClient::new(Some(qdrant_config))
        .map_err(|e| ApplicationBuildError::QdrantClientError(e.to_string()))
}
