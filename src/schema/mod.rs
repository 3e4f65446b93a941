pub mod schema;
pub mod dependency;
pub mod migration;
pub mod model_ids;
