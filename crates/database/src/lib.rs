use std::{env, error::Error};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{observation::Observation, vehicle::Vehicle, WithId};
use registry::database::{
    Database, DatabaseOperations, ObservationRepo, VehicleRepo,
};
use utility::id::Id;

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { connection: pool })
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl Database for PgDatabase {
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }
}

impl DatabaseOperations for PgDatabaseAutocommit {}

#[async_trait]
impl VehicleRepo for PgDatabaseAutocommit {
    async fn insert_vehicle(
        &mut self,
        vehicle: Vehicle,
    ) -> registry::database::Result<WithId<Vehicle>> {
        queries::vehicle::insert(&self.pool, vehicle).await
    }

    async fn vehicle_by_external_id(
        &mut self,
        external_id: &str,
    ) -> registry::database::Result<Option<WithId<Vehicle>>> {
        queries::vehicle::by_external_id(&self.pool, external_id).await
    }

    async fn vehicle(
        &mut self,
        id: &Id<Vehicle>,
    ) -> registry::database::Result<WithId<Vehicle>> {
        queries::vehicle::get(&self.pool, id).await
    }

    async fn vehicles(
        &mut self,
    ) -> registry::database::Result<Vec<WithId<Vehicle>>> {
        queries::vehicle::get_all(&self.pool).await
    }

    async fn advance_last_seen(
        &mut self,
        id: &Id<Vehicle>,
        at: DateTime<Utc>,
    ) -> registry::database::Result<DateTime<Utc>> {
        queries::vehicle::advance_last_seen(&self.pool, id, at).await
    }
}

#[async_trait]
impl ObservationRepo for PgDatabaseAutocommit {
    async fn insert_observation(
        &mut self,
        observation: Observation,
    ) -> registry::database::Result<WithId<Observation>> {
        queries::observation::insert(&self.pool, observation).await
    }

    async fn observations_for(
        &mut self,
        vehicle: &Id<Vehicle>,
    ) -> registry::database::Result<Vec<WithId<Observation>>> {
        queries::observation::get_for_vehicle(&self.pool, vehicle).await
    }
}
