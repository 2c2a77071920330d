use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::api::rest::routes;
use crate::domain::service::Service;
use crate::infra::storage::SeaOrmUsersRepository;

/// Wires the SeaORM repository (infra) into the domain service and
/// exposes its REST routes.
#[derive(Clone)]
pub struct UsersModule {
    service: Arc<Service>,
}

impl UsersModule {
    /// Build the module on top of an open connection and make sure the
    /// schema exists before anything is served.
    pub async fn init(conn: DatabaseConnection) -> anyhow::Result<Self> {
        info!("Initializing users module");

        let repo = SeaOrmUsersRepository::new(conn);
        let service = Service::new(Arc::new(repo));
        service
            .initialize()
            .await
            .context("users storage initialization failed")?;

        info!("Users module initialized");
        Ok(Self {
            service: Arc::new(service),
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering users REST routes");
        routes::register_routes(router, self.service.clone())
    }
}
