//! Exhaustive hyperparameter grids.

use gn_types::{ParameterSet, ParameterValue, PredictorSpec};
use serde::{Deserialize, Serialize};

/// One named dimension of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub name: String,
    pub values: Vec<ParameterValue>,
}

/// Ordered axes whose Cartesian product is searched exhaustively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub axes: Vec<GridAxis>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis<V: Into<ParameterValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.axes.push(GridAxis {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.name.as_str())
    }

    /// Number of combinations; zero if any axis is empty.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|axis| axis.values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, with the last axis varying fastest.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut result = vec![ParameterSet::new()];
        for axis in &self.axes {
            let mut next = Vec::with_capacity(result.len() * axis.values.len());
            for existing in &result {
                for value in &axis.values {
                    next.push(existing.clone().with(axis.name.clone(), value.clone()));
                }
            }
            result = next;
        }
        result
    }

    /// One predictor spec per combination for `method`.
    pub fn to_specs(&self, method: &str) -> Vec<PredictorSpec> {
        self.combinations()
            .into_iter()
            .map(|parameters| PredictorSpec::new(method, parameters))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_is_product_of_axis_sizes() {
        let grid = ParameterGrid::new()
            .axis("hidden", [1, 2, 4, 8])
            .axis("dropout_prob", [0.0, 0.2, 0.5])
            .axis("weight_decay", [0.0, 1e-4]);
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.combinations().len(), 24);
        assert_eq!(
            grid.names().collect::<Vec<_>>(),
            vec!["hidden", "dropout_prob", "weight_decay"]
        );
    }

    #[test]
    fn last_axis_varies_fastest() {
        let grid = ParameterGrid::new().axis("a", [1, 2]).axis("b", [10, 20]);
        let combos: Vec<String> = grid.combinations().iter().map(|c| c.to_string()).collect();
        assert_eq!(combos, vec!["a=1, b=10", "a=1, b=20", "a=2, b=10", "a=2, b=20"]);
    }

    #[test]
    fn empty_axis_yields_no_combinations() {
        let grid = ParameterGrid::new()
            .axis("hidden", [1, 2])
            .axis("epochs", Vec::<i64>::new());
        assert_eq!(grid.len(), 0);
        assert!(grid.is_empty());
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn no_axes_is_a_single_default_combination() {
        let grid = ParameterGrid::new();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.combinations(), vec![ParameterSet::new()]);
    }

    #[test]
    fn specs_carry_method_and_parameters() {
        let specs = ParameterGrid::new().axis("hidden", [3, 5]).to_specs("mlp");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].to_string(), "mlp(hidden=5)");
    }
}
