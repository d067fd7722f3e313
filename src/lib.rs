pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod records;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod validation;

pub use builder::{populate_store, ingest_nodes, RelationshipBuilder, RelationshipSet};
pub use config::Config;
pub use error::{GraphError, Result, SchemaError};
pub use resolver::IdResolver;
pub use schema::{Edge, EdgeKind, Node, NodeKind};
pub use store::GraphStore;
pub use validation::{ValidationReport, Validator};
