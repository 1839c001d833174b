pub mod compare;
pub mod grid;
pub mod result;
pub mod runner;

pub use compare::{compare_methods, ComparisonRecord};
pub use grid::{GridAxis, ParameterGrid};
pub use result::{mean_and_std, GridRow, OptimizationResult, ParameterGridResult};
pub use runner::{run_optimization, OptimizationOutcome, OptimizationRequest};
