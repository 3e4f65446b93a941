use std::collections::BTreeMap;
use tracing::warn;
use crate::core::error::StorageError;
use crate::schema::schema::{ModelDefinition, ModelId};

/// Compare the persisted id -> name mapping with the models defined in
/// process. Any remapping is reported, never coerced.
pub fn check_model_ids(
    stored: &BTreeMap<ModelId, String>,
    current: &[ModelDefinition],
) -> Result<(), StorageError> {
    for model in current {
        if let Some(stored_name) = stored.get(&model.id) {
            if stored_name != &model.name {
                warn!(target: "migration", id = model.id, stored = %stored_name, current = %model.name, "model id conflict");
                return Err(StorageError::ModelIdConflict {
                    id: model.id,
                    stored: stored_name.clone(),
                    current: model.name.clone(),
                });
            }
        }

        if let Some((stored_id, _)) = stored.iter().find(|(id, name)| **name == model.name && **id != model.id) {
            warn!(target: "migration", name = %model.name, stored = stored_id, current = model.id, "model id changed");
            return Err(StorageError::ModelIdChanged {
                name: model.name.clone(),
                stored: *stored_id,
                current: model.id,
            });
        }
    }
    Ok(())
}

/// Mapping to persist after a successful startup.
pub fn model_id_mapping(current: &[ModelDefinition]) -> BTreeMap<ModelId, String> {
    current.iter().map(|m| (m.id, m.name.clone())).collect()
}
