use crate::core::apportionment::{format_currency, OnusCalculator};
use crate::core::expansion::TermExpander;
use crate::core::export::{expanded_rows_to_csv, factors_to_csv};
use crate::core::reference::ReferenceData;
use crate::core::terms_csv::read_terms;
use crate::core::{ConfigProvider, Pipeline, Storage, Term, TransformResult};
use crate::domain::model::{CalculationOutcome, CalculationRequest};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

pub const EXPANDED_FILE: &str = "termos_expandidos.csv";
pub const REPORT_FILE: &str = "relatorio.json";

/// Reads terms, expands them against the reference tables and apportions the
/// fee for every configured calculation.
pub struct OnusPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) reference: Arc<ReferenceData>,
    calculator: OnusCalculator,
}

#[derive(Serialize)]
struct RunReport<'a> {
    generated_at: String,
    expanded_rows: usize,
    rejected_terms: &'a [crate::domain::model::RejectedTerm],
    outcomes: &'a [CalculationOutcome],
}

impl<S: Storage, C: ConfigProvider> OnusPipeline<S, C> {
    pub fn new(storage: S, config: C, reference: Arc<ReferenceData>) -> Self {
        Self {
            storage,
            config,
            reference,
            calculator: OnusCalculator::new(),
        }
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }

    fn evaluate(&self, request: CalculationRequest, result: &TransformResult) -> CalculationOutcome {
        match self.calculator.calculate_request(&request, &result.expanded_rows) {
            Ok(onus) => {
                if onus.is_empty() {
                    tracing::warn!(
                        "⚠️ Term {} has no municipality rows for the selected year",
                        request.label()
                    );
                } else {
                    tracing::info!(
                        "💰 Term {}: total {} over {} municipalities (avg {}, per capita {})",
                        request.label(),
                        format_currency(onus.total_onus),
                        onus.factors.len(),
                        onus.average_onus_per_municipality()
                            .map(format_currency)
                            .unwrap_or_default(),
                        onus.onus_per_capita()
                            .map(|v| format!("R$ {:.6}", v))
                            .unwrap_or_default()
                    );
                }
                let summary = self.calculator.summary_statistics(&onus);
                CalculationOutcome::Computed {
                    request,
                    result: onus,
                    summary,
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ Calculation {} skipped: {}", request.label(), e);
                CalculationOutcome::Invalid {
                    request,
                    reason: e.user_friendly_message(),
                }
            }
        }
    }
}

/// File name for a calculation's factor table, built from every selection
/// field so distinct requests never share a name. Unset fields are skipped.
pub fn factor_file_name(request: &CalculationRequest) -> String {
    let parts = [
        request.base_year.map(|y| y.to_string()),
        request.entity.map(|e| e.to_string()),
        request.state.clone(),
        request.term_number.clone(),
        request.term_year.map(|y| y.to_string()),
    ];
    let stem: Vec<String> = parts
        .iter()
        .flatten()
        .map(|part| path_safe(part))
        .filter(|part| !part.is_empty())
        .collect();

    if stem.is_empty() {
        "fatores.csv".to_string()
    } else {
        format!("fatores_{}.csv", stem.join("_"))
    }
}

// Term numbers may contain '/' and operator names contain spaces.
fn path_safe(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Suffixes `_2`, `_3`, ... when the same request is listed more than once.
fn claim_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let stem = name.trim_end_matches(".csv").to_string();
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}.csv", stem, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for OnusPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Term>> {
        tracing::debug!("Reading terms from: {}", self.config.terms_file());
        let data = self.storage.read_file(self.config.terms_file()).await?;
        read_terms(data.as_slice())
    }

    async fn transform(&self, terms: Vec<Term>) -> Result<TransformResult> {
        let expander = TermExpander::new(&self.reference);
        let report = expander.expand_all(&terms);

        let mut result = TransformResult {
            expanded_rows: report.rows,
            rejected_terms: report.rejected,
            outcomes: Vec::new(),
        };

        for request in self.config.calculations() {
            let outcome = self.evaluate(request, &result);
            result.outcomes.push(outcome);
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.output_path().trim_end_matches('/');
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if self.wants("csv") {
            files.push((
                EXPANDED_FILE.to_string(),
                expanded_rows_to_csv(&result.expanded_rows)?.into_bytes(),
            ));
            let mut used = HashSet::new();
            for outcome in &result.outcomes {
                if let CalculationOutcome::Computed { request, result, .. } = outcome {
                    let name = claim_name(factor_file_name(request), &mut used);
                    files.push((name, factors_to_csv(&result.factors)?.into_bytes()));
                }
            }
        }

        if self.wants("json") {
            let report = RunReport {
                generated_at: chrono::Utc::now().to_rfc3339(),
                expanded_rows: result.expanded_rows.len(),
                rejected_terms: &result.rejected_terms,
                outcomes: &result.outcomes,
            };
            files.push((REPORT_FILE.to_string(), serde_json::to_string_pretty(&report)?.into_bytes()));
        }

        if let Some(archive) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, content) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(content)?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            let archive_path = format!("{}/{}", output_path, archive);
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&archive_path, &zip_data).await?;
            return Ok(archive_path);
        }

        for (name, content) in &files {
            self.storage
                .write_file(&format!("{}/{}", output_path, name), content)
                .await?;
        }
        tracing::debug!("Wrote {} files", files.len());

        Ok(output_path.to_string())
    }
}
