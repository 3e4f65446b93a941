use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use crate::core::config::MigrationConfig;
use crate::core::error::{Result, StorageError};
use crate::schema::dependency::order_migration_model_ids;
use crate::schema::schema::{IndexDefinition, ModelDefinition, ModelId};

/// Outcome of comparing a stored model definition with the in-process one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    UpToDate,
    /// Nothing stored yet for this model.
    NewModel,
    /// Only additive changes; old readers ignore the new fields.
    OnlySafeAdds,
    /// Indexes were added over properties that already hold data.
    NewIndicesOnExistingProperties(Vec<IndexDefinition>),
    NeedsMigration(Vec<String>),
}

impl MigrationStatus {
    /// Aggregation order across models. Higher is more severe.
    pub fn severity(&self) -> u8 {
        match self {
            MigrationStatus::UpToDate => 0,
            MigrationStatus::NewModel | MigrationStatus::OnlySafeAdds => 1,
            MigrationStatus::NewIndicesOnExistingProperties(_) => 2,
            MigrationStatus::NeedsMigration(_) => 3,
        }
    }
}

fn incompatibility_reasons(current: &ModelDefinition, stored: &ModelDefinition) -> Vec<String> {
    let mut reasons = Vec::new();

    if stored.version.major != current.version.major {
        reasons.push(format!(
            "major version mismatch: stored {} and current {}",
            stored.version, current.version
        ));
    }

    if stored.key_shape_identity() != current.key_shape_identity() {
        reasons.push(format!(
            "key definition changed: stored {:?} and current {:?}",
            stored.key_shape_identity(),
            current.key_shape_identity()
        ));
    }

    for old in &stored.properties {
        match current.property(old.index) {
            None if old.required => reasons.push(format!(
                "missing/incompatible property: required property {} ({}) was removed",
                old.name, old.index
            )),
            None => {
                if !current.reserved_indices.contains(&old.index) {
                    warn!(
                        target: "migration",
                        model = %current.name,
                        property = %old.name,
                        "property removed without reserving its index"
                    );
                }
            }
            Some(new) if !new.property_type.can_read(&old.property_type) => reasons.push(format!(
                "missing/incompatible property: {} ({}) changed from {:?} to {:?}",
                old.name, old.index, old.property_type, new.property_type
            )),
            Some(new) if new.required && !old.required => reasons.push(format!(
                "missing/incompatible property: {} ({}) became required",
                new.name, new.index
            )),
            Some(_) => {}
        }
    }

    for new in &current.properties {
        if new.required && stored.property(new.index).is_none() {
            reasons.push(format!(
                "missing/incompatible property: new property {} ({}) is required but absent in stored data",
                new.name, new.index
            ));
        }
    }

    reasons
}

fn collides_with_reserved(current: &ModelDefinition, stored: &ModelDefinition) -> bool {
    current.properties.iter().any(|p| {
        stored.reserved_indices.contains(&p.index) || stored.reserved_names.contains(&p.name)
    })
}

fn new_indexes(current: &ModelDefinition, stored: &ModelDefinition) -> Vec<IndexDefinition> {
    current
        .indexes
        .iter()
        .filter(|index| !stored.indexes.iter().any(|s| s.name == index.name))
        .filter(|index| index.property_indices.iter().all(|i| stored.property(*i).is_some()))
        .cloned()
        .collect()
}

/// Classify the stored data of one model against its current definition.
pub fn is_migration_needed(current: &ModelDefinition, stored: Option<&ModelDefinition>) -> MigrationStatus {
    let Some(stored) = stored else {
        return MigrationStatus::NewModel;
    };

    let reasons = incompatibility_reasons(current, stored);
    let status = if !reasons.is_empty() {
        MigrationStatus::NeedsMigration(reasons)
    } else {
        let indexes = new_indexes(current, stored);
        if !indexes.is_empty() {
            MigrationStatus::NewIndicesOnExistingProperties(indexes)
        } else if collides_with_reserved(current, stored) {
            // Any reuse of a reserved identifier is never reported as up to date
            MigrationStatus::OnlySafeAdds
        } else if stored.version == current.version {
            MigrationStatus::UpToDate
        } else {
            MigrationStatus::OnlySafeAdds
        }
    };

    debug!(
        target: "migration",
        model = %current.name,
        stored_version = %stored.version,
        current_version = %current.version,
        ?status,
        "compared model definitions"
    );
    status
}

#[derive(Debug)]
pub enum StartupDecision {
    Proceed,
    /// Stored definitions of these models are extended in place.
    Extend(Vec<ModelId>),
    Abort(StorageError),
}

#[derive(Debug)]
pub struct StartupPlan {
    pub ordered_ids: Vec<ModelId>,
    pub statuses: BTreeMap<ModelId, MigrationStatus>,
    pub decision: StartupDecision,
}

impl StartupPlan {
    pub fn worst_status(&self) -> Option<&MigrationStatus> {
        self.statuses.values().max_by_key(|s| s.severity())
    }
}

/// Check every model in dependency order and decide whether a backend may
/// start. A dependency cycle fails the whole call.
pub fn plan_startup(
    current: &BTreeMap<ModelId, ModelDefinition>,
    stored: &BTreeMap<ModelId, ModelDefinition>,
    config: &MigrationConfig,
) -> Result<StartupPlan> {
    let ordered_ids = order_migration_model_ids(current)?;
    let mut statuses = BTreeMap::new();
    let mut to_extend = Vec::new();
    let mut abort = None;

    for id in &ordered_ids {
        let model = &current[id];
        let status = is_migration_needed(model, stored.get(id));
        match &status {
            MigrationStatus::UpToDate => {}
            MigrationStatus::NeedsMigration(reasons) => {
                if abort.is_none() {
                    abort = Some(StorageError::MigrationRequired {
                        model: model.name.clone(),
                        reasons: reasons.clone(),
                    });
                }
            }
            MigrationStatus::NewModel => to_extend.push(*id),
            MigrationStatus::OnlySafeAdds | MigrationStatus::NewIndicesOnExistingProperties(_) => {
                if config.auto_extend_safe_adds {
                    to_extend.push(*id);
                } else if abort.is_none() {
                    abort = Some(StorageError::MigrationRequired {
                        model: model.name.clone(),
                        reasons: vec!["additive changes found and auto extension is disabled".to_string()],
                    });
                }
            }
        }
        statuses.insert(*id, status);
    }

    let decision = match abort {
        Some(err) => {
            warn!(target: "migration", error = %err, "startup blocked by model changes");
            StartupDecision::Abort(err)
        }
        None if to_extend.is_empty() => StartupDecision::Proceed,
        None => {
            info!(target: "migration", models = ?to_extend, "extending stored model definitions");
            StartupDecision::Extend(to_extend)
        }
    };

    Ok(StartupPlan {
        ordered_ids,
        statuses,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema::{KeyPartKind, PropertyType, Version};

    fn v1() -> ModelDefinition {
        ModelDefinition::new(1, "Person", Version::new(1, 0, 0))
            .with_key_part(KeyPartKind::Uuid, 16, None)
            .with_property(1, "name", PropertyType::String, true)
            .with_property(2, "age", PropertyType::Int32, false)
    }

    fn reasons(status: MigrationStatus) -> Vec<String> {
        match status {
            MigrationStatus::NeedsMigration(reasons) => reasons,
            other => panic!("expected NeedsMigration, got {:?}", other),
        }
    }

    #[test]
    fn identical_is_up_to_date() {
        assert_eq!(is_migration_needed(&v1(), Some(&v1())), MigrationStatus::UpToDate);
    }

    #[test]
    fn nothing_stored_is_new_model() {
        assert_eq!(is_migration_needed(&v1(), None), MigrationStatus::NewModel);
    }

    #[test]
    fn new_optional_field_is_safe_add() {
        let mut current = v1().with_property(3, "email", PropertyType::String, false);
        current.version = Version::new(1, 1, 0);
        assert_eq!(is_migration_needed(&current, Some(&v1())), MigrationStatus::OnlySafeAdds);
    }

    #[test]
    fn widened_type_is_safe_add() {
        let mut current = v1();
        current.properties[1].property_type = PropertyType::Int64;
        current.version = Version::new(1, 0, 1);
        assert_eq!(is_migration_needed(&current, Some(&v1())), MigrationStatus::OnlySafeAdds);
    }

    #[test]
    fn missing_required_field_needs_migration() {
        let mut current = v1();
        current.properties.remove(0);
        current.version = Version::new(1, 1, 0);
        let reasons = reasons(is_migration_needed(&current, Some(&v1())));
        assert!(reasons[0].contains("missing/incompatible property"));
        assert!(reasons[0].contains("name"));
    }

    #[test]
    fn changed_key_shape_needs_migration() {
        let mut current = v1();
        current.key_definition[0].byte_size = 8;
        let reasons = reasons(is_migration_needed(&current, Some(&v1())));
        assert!(reasons[0].starts_with("key definition changed"));
    }

    #[test]
    fn major_version_needs_migration() {
        let mut current = v1();
        current.version = Version::new(2, 0, 0);
        let reasons = reasons(is_migration_needed(&current, Some(&v1())));
        assert!(reasons[0].starts_with("major version mismatch"));
    }

    #[test]
    fn narrowed_type_and_new_required_are_both_reported() {
        let mut current = v1().with_property(4, "ssn", PropertyType::String, true);
        current.properties[1].property_type = PropertyType::Int32;
        current.properties[1].required = true;
        let reasons = reasons(is_migration_needed(&current, Some(&v1())));
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("became required"));
        assert!(reasons[1].contains("ssn"));
    }

    #[test]
    fn reserved_collision_is_never_up_to_date() {
        let stored = v1().with_reserved(5, "nickname");
        let current = v1().with_reserved(5, "nickname").with_property(5, "nickname", PropertyType::String, false);
        assert_eq!(is_migration_needed(&current, Some(&stored)), MigrationStatus::OnlySafeAdds);
    }

    #[test]
    fn index_over_existing_property() {
        let current = v1().with_index("by_name", vec![1]);
        assert_eq!(
            is_migration_needed(&current, Some(&v1())),
            MigrationStatus::NewIndicesOnExistingProperties(vec![IndexDefinition {
                name: "by_name".to_string(),
                property_indices: vec![1],
            }])
        );
    }

    #[test]
    fn severity_orders_statuses() {
        assert!(MigrationStatus::UpToDate.severity() < MigrationStatus::OnlySafeAdds.severity());
        assert!(
            MigrationStatus::OnlySafeAdds.severity() < MigrationStatus::NeedsMigration(vec![]).severity()
        );
    }

    fn address() -> ModelDefinition {
        ModelDefinition::new(2, "Address", Version::new(1, 0, 0))
            .with_key_part(KeyPartKind::Uuid, 16, None)
            .with_property(1, "street", PropertyType::String, false)
    }

    fn models(list: Vec<ModelDefinition>) -> BTreeMap<ModelId, ModelDefinition> {
        list.into_iter().map(|m| (m.id, m)).collect()
    }

    #[test]
    fn startup_extends_new_and_safe_models() {
        let mut person = v1().with_property(3, "home", PropertyType::Embed(2), false);
        person.version = Version::new(1, 1, 0);
        let current = models(vec![person, address()]);
        let stored = models(vec![v1()]);

        let plan = plan_startup(&current, &stored, &MigrationConfig::default()).unwrap();
        assert_eq!(plan.ordered_ids, vec![2, 1]);
        assert_eq!(plan.statuses[&2], MigrationStatus::NewModel);
        assert_eq!(plan.statuses[&1], MigrationStatus::OnlySafeAdds);
        assert!(matches!(plan.decision, StartupDecision::Extend(ref ids) if ids == &vec![2, 1]));
    }

    #[test]
    fn startup_aborts_when_extension_disabled() {
        let mut extended = v1().with_property(3, "email", PropertyType::String, false);
        extended.version = Version::new(1, 1, 0);
        let current = models(vec![extended]);
        let stored = models(vec![v1()]);
        let config = MigrationConfig {
            auto_extend_safe_adds: false,
        };

        let plan = plan_startup(&current, &stored, &config).unwrap();
        assert!(matches!(plan.decision, StartupDecision::Abort(StorageError::MigrationRequired { .. })));
    }

    #[test]
    fn startup_aborts_on_needed_migration() {
        let mut changed = v1();
        changed.version = Version::new(2, 0, 0);
        let plan = plan_startup(&models(vec![changed]), &models(vec![v1()]), &MigrationConfig::default()).unwrap();
        assert_eq!(plan.worst_status().map(|s| s.severity()), Some(3));
        assert!(matches!(plan.decision, StartupDecision::Abort(_)));
    }

    #[test]
    fn startup_proceeds_when_everything_matches() {
        let plan = plan_startup(&models(vec![v1()]), &models(vec![v1()]), &MigrationConfig::default()).unwrap();
        assert!(matches!(plan.decision, StartupDecision::Proceed));
    }

    #[test]
    fn startup_fails_on_cycle() {
        let a = v1().with_property(3, "address", PropertyType::Reference(2), false);
        let b = address().with_property(2, "owner", PropertyType::Reference(1), false);
        let err = plan_startup(&models(vec![a, b]), &BTreeMap::new(), &MigrationConfig::default()).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Migration);
        assert!(err.context.contains("Person -> Address -> Person"));
    }
}
