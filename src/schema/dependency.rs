use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;
use crate::core::error::MigrationError;
use crate::schema::schema::{ModelDefinition, ModelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

/// Id-keyed adjacency list of model dependencies. Built per analysis and
/// never follows model objects, only declared edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    pub edges: BTreeMap<ModelId, BTreeSet<ModelId>>,
}

impl DependencyGraph {
    /// Self references are left out: a model can always be migrated
    /// before or after itself.
    pub fn build(models: &BTreeMap<ModelId, ModelDefinition>) -> Result<Self, MigrationError> {
        let mut edges = BTreeMap::new();
        for (id, model) in models {
            if *id != model.id {
                return Err(MigrationError::ModelIdMismatch {
                    name: model.name.clone(),
                    key: *id,
                    id: model.id,
                });
            }
            let mut deps = model.dependencies();
            deps.remove(id);
            if let Some(missing) = deps.iter().find(|dep| !models.contains_key(*dep)) {
                return Err(MigrationError::UnknownDependency {
                    model: model.name.clone(),
                    missing: *missing,
                });
            }
            edges.insert(*id, deps);
        }
        Ok(DependencyGraph { edges })
    }

    /// Depth-first topological order; dependencies come before dependents,
    /// independent models in ascending id order.
    pub fn topological_order(&self) -> Result<Vec<ModelId>, Vec<ModelId>> {
        let mut states = BTreeMap::new();
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.edges.len());

        for id in self.edges.keys() {
            self.visit(*id, &mut states, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: ModelId,
        states: &mut BTreeMap<ModelId, VisitState>,
        path: &mut Vec<ModelId>,
        order: &mut Vec<ModelId>,
    ) -> Result<(), Vec<ModelId>> {
        match states.get(&id) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::Visiting) => {
                // Back edge: the cycle is the path from the first visit of `id`.
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(id);
                return Err(cycle);
            }
            None => {}
        }

        states.insert(id, VisitState::Visiting);
        path.push(id);
        if let Some(deps) = self.edges.get(&id) {
            for dep in deps {
                self.visit(*dep, states, path, order)?;
            }
        }
        path.pop();
        states.insert(id, VisitState::Done);
        order.push(id);
        Ok(())
    }
}

/// Order in which models must be checked and migrated.
pub fn order_migration_model_ids(
    models: &BTreeMap<ModelId, ModelDefinition>,
) -> Result<Vec<ModelId>, MigrationError> {
    let graph = DependencyGraph::build(models)?;
    graph.topological_order().map_err(|cycle| {
        let path: Vec<String> = cycle
            .iter()
            .map(|id| models.get(id).map(|m| m.name.clone()).unwrap_or_else(|| id.to_string()))
            .collect();
        warn!(target: "migration", cycle = %path.join(" -> "), "model dependency cycle");
        MigrationError::DependencyCycle { path }
    })
}
