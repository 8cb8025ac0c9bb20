//! Application Startup
//!
//! Builds one of the three services from settings and runs it until Ctrl-C.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::services::{DirectoryApi, DirectoryService, GatewayService};
use crate::config::{ServiceRole, Settings};
use crate::domain::{LoadStore, ServerDescriptor, TokenStore};
use crate::infrastructure::cache::{create_redis_pool, RedisStore};
use crate::infrastructure::database;
use crate::infrastructure::pool::ManagedPool;
use crate::infrastructure::repositories::PgUserRepository;
use crate::infrastructure::rpc::{create_directory_pool, DirectoryClient};
use crate::presentation::http::{
    create_directory_router, create_gateway_router, handlers::health, DirectoryState,
    GatewayState, PoolSet,
};
use crate::presentation::tcp::ChatServer;

enum Service {
    Http { listener: TcpListener, router: Router },
    Chat(ChatServer),
}

/// Application instance
pub struct Application {
    role: ServiceRole,
    service: Service,
    pools: PoolSet,
    checkers: Vec<JoinHandle<()>>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let mut checkers = Vec::new();
        let (service, pools) = match settings.role {
            ServiceRole::Gateway => {
                let db = database::create_pool(&settings.database, &settings.pool).await;
                let rpc = create_directory_pool(&settings.directory, &settings.pool).await;
                checkers.push(db.spawn_health_checker());
                checkers.push(rpc.spawn_health_checker());
                info!("Database and directory pools created");

                let pools = PoolSet::new(vec![
                    Arc::new(db.clone()) as Arc<dyn ManagedPool>,
                    Arc::new(rpc.clone()) as Arc<dyn ManagedPool>,
                ]);
                let gateway = GatewayService::new(
                    Arc::new(PgUserRepository::new(db)),
                    Arc::new(DirectoryClient::new(rpc)),
                );
                let router = create_gateway_router(GatewayState {
                    gateway: Arc::new(gateway),
                    pools: pools.clone(),
                });
                (http_service(&settings, router).await?, pools)
            }
            ServiceRole::Directory => {
                let redis = create_redis_pool(&settings.redis, &settings.pool).await?;
                checkers.push(redis.spawn_health_checker());

                let pools = PoolSet::new(vec![Arc::new(redis.clone()) as Arc<dyn ManagedPool>]);
                let store = Arc::new(RedisStore::new(redis));
                let servers = settings
                    .directory
                    .servers
                    .iter()
                    .map(ServerDescriptor::from)
                    .collect::<Vec<_>>();
                if servers.is_empty() {
                    warn!("No chat servers configured, every selection will fail");
                }
                let directory = DirectoryService::new(
                    servers,
                    Arc::clone(&store) as Arc<dyn LoadStore>,
                    store as Arc<dyn TokenStore>,
                );
                let router = create_directory_router(DirectoryState {
                    directory: Arc::new(directory),
                    pools: pools.clone(),
                });
                (http_service(&settings, router).await?, pools)
            }
            ServiceRole::Chat => {
                let redis = create_redis_pool(&settings.redis, &settings.pool).await?;
                let rpc = create_directory_pool(&settings.directory, &settings.pool).await;
                checkers.push(redis.spawn_health_checker());
                checkers.push(rpc.spawn_health_checker());

                let pools = PoolSet::new(vec![
                    Arc::new(redis.clone()) as Arc<dyn ManagedPool>,
                    Arc::new(rpc.clone()) as Arc<dyn ManagedPool>,
                ]);
                let server = ChatServer::bind(
                    settings.chat.clone(),
                    Arc::new(DirectoryClient::new(rpc)) as Arc<dyn DirectoryApi>,
                    Arc::new(RedisStore::new(redis)) as Arc<dyn LoadStore>,
                )
                .await?;
                (Service::Chat(server), pools)
            }
        };

        Ok(Self {
            role: settings.role,
            service,
            pools,
            checkers,
        })
    }

    /// Run until Ctrl-C.
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then close every pool.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(role = %self.role, addr = %self.local_addr()?, "Service starting");

        match self.service {
            Service::Http { listener, router } => {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
            Service::Chat(server) => server.run_until_stopped(shutdown).await?,
        }

        self.pools.close_all();
        for checker in self.checkers {
            if let Err(e) = checker.await {
                warn!(error = %e, "Pool health checker failed");
            }
        }
        info!(role = %self.role, "Service stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.service {
            Service::Http { listener, .. } => listener.local_addr(),
            Service::Chat(server) => server.local_addr(),
        }
    }
}

async fn http_service(settings: &Settings, router: Router) -> Result<Service> {
    let listener = TcpListener::bind(settings.server_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(Service::Http { listener, router })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}
