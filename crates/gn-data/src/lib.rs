pub mod clean;
pub mod folds;
pub mod loaders;
pub mod shelf;

pub use clean::clean_dataset;
pub use folds::fold_split;
pub use loaders::{load_genotype_data, read_markers, read_phenotypes};
pub use shelf::{shelf_key, split_shelf_key, JsonShelf, ShelfDirectory, Store, DIRECTORY_SHELF};
