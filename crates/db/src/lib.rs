pub mod connection;
pub mod fixtures;
pub mod repositories;
pub mod schema;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    CustomerStore, InMemoryCustomerRepository, RepositoryError, SqlCustomerRepository,
};
pub use schema::{InitializedSchema, SchemaError, SchemaInitializer};
