pub mod comparison_file_repo;
pub mod comparison_repo;

pub use comparison_file_repo::ComparisonFileRepo;
pub use comparison_repo::ComparisonRepo;
