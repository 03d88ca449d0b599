use std::collections::{BTreeSet, HashMap, HashSet};

use super::stage::StageDefinition;
use super::template::PromptRenderer;
use crate::error::GraphError;

/// Validated stage DAG with a precomputed execution plan.
///
/// `layers()` holds stage indices grouped by Kahn layer: every stage of a
/// layer depends only on stages of earlier layers. Inside a layer the
/// declaration order is kept.
#[derive(Clone, Debug)]
pub struct StageGraph {
    stages: Vec<StageDefinition>,
    layers: Vec<Vec<usize>>,
}

impl StageGraph {
    pub fn new(stages: Vec<StageDefinition>, renderer: &PromptRenderer) -> Result<Self, GraphError> {
        if stages.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::new();
        for (i, stage) in stages.iter().enumerate() {
            if index.insert(stage.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }
        }

        for stage in &stages {
            for dep in stage.dependencies() {
                if !index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        stage: stage.name.clone(),
                        dependency: dep.to_string(),
                    });
                }
            }
            renderer.check(&stage.name, &stage.template, &stage.variables())?;
        }

        let layers = Self::layer(&stages, &index)?;
        Ok(Self { stages, layers })
    }

    fn layer(
        stages: &[StageDefinition],
        index: &HashMap<&str, usize>,
    ) -> Result<Vec<Vec<usize>>, GraphError> {
        let mut indegree: Vec<usize> = stages
            .iter()
            .map(|s| s.dependencies().collect::<HashSet<_>>().len())
            .collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
        for (i, stage) in stages.iter().enumerate() {
            for dep in stage.dependencies().collect::<BTreeSet<_>>() {
                dependents[index[dep]].push(i);
            }
        }

        let mut layers = Vec::new();
        let mut current: Vec<usize> = (0..stages.len()).filter(|&i| indegree[i] == 0).collect();
        let mut placed = 0;

        while !current.is_empty() {
            placed += current.len();
            let mut next = Vec::new();
            for &i in &current {
                for &d in &dependents[i] {
                    indegree[d] -= 1;
                    if indegree[d] == 0 {
                        next.push(d);
                    }
                }
            }
            next.sort_unstable();
            layers.push(current);
            current = next;
        }

        if placed < stages.len() {
            let stuck = (0..stages.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| stages[i].name.clone())
                .collect();
            return Err(GraphError::Cycle { stages: stuck });
        }

        Ok(layers)
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn layers(&self) -> &[Vec<usize>] {
        &self.layers
    }

    /// Stage names per layer, for logging and inspection.
    pub fn layer_names(&self) -> Vec<Vec<&str>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&i| self.stages[i].name.as_str()).collect())
            .collect()
    }
}
