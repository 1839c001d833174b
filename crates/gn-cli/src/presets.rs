//! Named optimization runs: which method, which grid, which shelf.

use clap::ValueEnum;
use gn_methods::{MlpNetwork, RbfNetwork, RidgeRegression};
use gn_optimizer::{OptimizationRequest, ParameterGrid};

const HIDDEN_WIDE: [i64; 10] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512];
const HIDDEN: [i64; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
const DROPOUT: [f64; 3] = [0.0, 0.2, 0.5];
const WEIGHT_DECAY: [f64; 3] = [0.0, 1e-4, 1e-2];
const BATCH_SIZE: i64 = 100;
const EPOCHS: i64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Single hidden layer network over hidden sizes.
    Mlp,
    /// Network over hidden size, weight decay and dropout.
    Wddo,
    /// Radial basis function network.
    Rbf,
    /// Ridge regression baseline.
    Ridge,
}

impl Preset {
    /// Registered method the grid is evaluated with.
    pub fn method_id(self) -> &'static str {
        match self {
            Preset::Mlp | Preset::Wddo => MlpNetwork::NAME,
            Preset::Rbf => RbfNetwork::NAME,
            Preset::Ridge => RidgeRegression::NAME,
        }
    }

    /// Name recorded in the master index.
    pub fn method_name(self) -> &'static str {
        match self {
            Preset::Mlp => "N",
            Preset::Wddo => "NWDDO",
            Preset::Rbf => "RBF",
            Preset::Ridge => "RR",
        }
    }

    pub fn shelf_name(self) -> &'static str {
        match self {
            Preset::Mlp => "optimal_nn.shelf",
            Preset::Wddo => "optimal_wddonn.shelf",
            Preset::Rbf => "optimal_rbf.shelf",
            Preset::Ridge => "optimal_ridge.shelf",
        }
    }

    pub fn grid(self) -> ParameterGrid {
        match self {
            Preset::Mlp => ParameterGrid::new()
                .axis("hidden", HIDDEN_WIDE)
                .axis("batch_size", [BATCH_SIZE])
                .axis("epochs", [EPOCHS]),
            Preset::Wddo => ParameterGrid::new()
                .axis("hidden", HIDDEN)
                .axis("dropout_prob", DROPOUT)
                .axis("weight_decay", WEIGHT_DECAY)
                .axis("batch_size", [BATCH_SIZE])
                .axis("epochs", [EPOCHS]),
            Preset::Rbf => ParameterGrid::new()
                .axis("hidden", [5i64, 10, 20, 40, 80])
                .axis("weight_decay", [0.0, 1e-3, 1e-1]),
            Preset::Ridge => {
                ParameterGrid::new().axis("alpha", [0.01, 0.1, 1.0, 10.0, 100.0, 1000.0])
            }
        }
    }

    pub fn request(
        self,
        species: &str,
        trait_name: &str,
        force: bool,
        verbose: bool,
    ) -> OptimizationRequest {
        OptimizationRequest {
            method_id: self.method_id().to_string(),
            method_name: self.method_name().to_string(),
            shelf_name: self.shelf_name().to_string(),
            grid: self.grid(),
            species: species.to_string(),
            trait_name: trait_name.to_string(),
            force,
            verbose,
        }
    }
}
