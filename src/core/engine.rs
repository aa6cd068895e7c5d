use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct OnusEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> OnusEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting ônus apportionment run");
        self.monitor.log_stats("start");

        tracing::info!("📥 Reading terms...");
        let terms = self.pipeline.extract().await?;
        tracing::info!("Read {} terms", terms.len());
        self.monitor.log_stats("extract");

        tracing::info!("🧮 Expanding terms and apportioning...");
        let result = self.pipeline.transform(terms).await?;
        tracing::info!(
            "Expanded {} municipality rows, {} terms rejected, {} calculations",
            result.expanded_rows.len(),
            result.rejected_terms.len(),
            result.outcomes.len()
        );
        self.monitor.log_stats("transform");

        tracing::info!("💾 Writing outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
