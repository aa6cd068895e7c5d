use crate::domain::model::{CalculationRequest, Term, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn area_file(&self) -> &str;
    fn population_file(&self) -> &str;
    fn terms_file(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    /// Name of the ZIP bundle, when outputs should be compressed.
    fn archive_name(&self) -> Option<&str>;
    fn calculations(&self) -> Vec<CalculationRequest>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Term>>;
    async fn transform(&self, terms: Vec<Term>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
