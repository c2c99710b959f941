pub mod ddl;
pub mod dml;
pub mod eval;
pub mod executor;
pub mod query;

pub use executor::{Executor, ExecutorPipeline};
