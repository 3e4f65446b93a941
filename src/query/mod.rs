pub mod matcher;
pub mod fuzzy;
pub mod partial;
pub mod scan;
