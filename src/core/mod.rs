pub mod apportionment;
pub mod area;
pub mod engine;
pub mod expansion;
pub mod export;
pub mod reference;
pub mod session;
mod tabular;
pub mod terms_csv;

pub use crate::domain::model::{ExpandedRow, FactorRow, OnusResult, Term, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
