pub mod comparison;
pub mod status;

pub use comparison::{Comparison, ComparisonFile, NewComparisonFile};
pub use status::{ComparisonStatus, FileStatus};
