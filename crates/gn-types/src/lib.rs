pub mod config;
pub mod errors;
pub mod genotype;
pub mod jobs;
pub mod params;
pub mod predictor;

pub use config::*;
pub use errors::*;
pub use genotype::*;
pub use jobs::*;
pub use params::*;
pub use predictor::*;
