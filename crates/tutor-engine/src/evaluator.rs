use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use tutor_core::instructions::{SYSTEM_IMPROVEMENT, SYSTEM_JUDGE};
use tutor_core::{excerpt, ResponseMode, PREVIEW_CHARS};

use crate::engine::ResponseGenerator;
use crate::error::Result;
use crate::parse::parse_scores;
use crate::prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Criterion {
    Accuracy,
    Clarity,
    Relevance,
    EducationalValue,
    HintAppropriateness,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Accuracy,
        Criterion::Clarity,
        Criterion::Relevance,
        Criterion::EducationalValue,
        Criterion::HintAppropriateness,
    ];

    /// Key used in scores and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Accuracy => "accuracy",
            Criterion::Clarity => "clarity",
            Criterion::Relevance => "relevance",
            Criterion::EducationalValue => "educational_value",
            Criterion::HintAppropriateness => "hint_appropriateness",
        }
    }

    /// How the criterion appears in judge text, lowercased.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scores {
    pub accuracy: u32,
    pub clarity: u32,
    pub relevance: u32,
    pub educational_value: u32,
    pub hint_appropriateness: u32,
}

impl Scores {
    pub fn get(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::Accuracy => self.accuracy,
            Criterion::Clarity => self.clarity,
            Criterion::Relevance => self.relevance,
            Criterion::EducationalValue => self.educational_value,
            Criterion::HintAppropriateness => self.hint_appropriateness,
        }
    }

    pub fn set(&mut self, criterion: Criterion, value: u32) {
        let slot = match criterion {
            Criterion::Accuracy => &mut self.accuracy,
            Criterion::Clarity => &mut self.clarity,
            Criterion::Relevance => &mut self.relevance,
            Criterion::EducationalValue => &mut self.educational_value,
            Criterion::HintAppropriateness => &mut self.hint_appropriateness,
        };
        *slot = value;
    }

    pub fn total(&self) -> u32 {
        Criterion::ALL
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(self.get(*c)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRecord {
    pub query: String,
    /// The evaluated response, cut to a preview.
    pub response: String,
    pub mode: ResponseMode,
    pub scores: Scores,
    pub total_score: u32,
    /// Raw judge output.
    pub evaluation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModeBreakdown {
    pub counts: BTreeMap<String, usize>,
    /// Mean total score, only for modes that have records.
    pub average_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationSummary {
    pub total_evaluations: usize,
    pub average_scores: BTreeMap<String, f64>,
    pub total_average: f64,
    pub mode_breakdown: ModeBreakdown,
}

impl EvaluationSummary {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let n = records.len() as f64;

        let average_scores: BTreeMap<String, f64> = Criterion::ALL
            .iter()
            .map(|c| {
                let sum: f64 = records.iter().map(|r| f64::from(r.scores.get(*c))).sum();
                (c.as_str().to_string(), sum / n)
            })
            .collect();
        let total_average = average_scores.values().sum();

        let mut breakdown = ModeBreakdown::default();
        for mode in ResponseMode::ALL {
            let totals: Vec<f64> = records
                .iter()
                .filter(|r| r.mode == mode)
                .map(|r| f64::from(r.total_score))
                .collect();
            breakdown.counts.insert(mode.to_string(), totals.len());
            if !totals.is_empty() {
                let mean = totals.iter().sum::<f64>() / totals.len() as f64;
                breakdown.average_scores.insert(mode.to_string(), mean);
            }
        }

        Self {
            total_evaluations: records.len(),
            average_scores,
            total_average,
            mode_breakdown: breakdown,
        }
    }
}

/// Exported report: the aggregate plus every record behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub detailed_evaluations: Vec<EvaluationRecord>,
}

/// LLM-as-judge scoring with an append-only, in-memory record list.
pub struct Evaluator {
    generator: Arc<dyn ResponseGenerator>,
    records: Mutex<Vec<EvaluationRecord>>,
}

impl Evaluator {
    pub fn new(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self::from_records(generator, Vec::new())
    }

    /// Rebuild an evaluator from previously exported records.
    pub fn from_records(generator: Arc<dyn ResponseGenerator>, records: Vec<EvaluationRecord>) -> Self {
        Self {
            generator,
            records: Mutex::new(records),
        }
    }

    pub async fn evaluate(
        &self,
        query: &str,
        response: &str,
        mode: ResponseMode,
        context: &str,
    ) -> Result<EvaluationRecord> {
        let judge_prompt = prompt::judge_prompt(query, response, mode, context);
        let evaluation = self
            .generator
            .generate_text(&judge_prompt, Some(SYSTEM_JUDGE))
            .await?;

        let scores = parse_scores(&evaluation);
        let record = EvaluationRecord {
            query: query.to_string(),
            response: excerpt(response, PREVIEW_CHARS),
            mode,
            scores,
            total_score: scores.total(),
            evaluation,
        };

        tracing::info!(%mode, total = record.total_score, "response evaluated");
        self.records.lock().push(record.clone());
        Ok(record)
    }

    pub fn summarize(&self) -> EvaluationSummary {
        EvaluationSummary::from_records(&self.records.lock())
    }

    pub fn records(&self) -> Vec<EvaluationRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn report(&self) -> EvaluationReport {
        let records = self.records();
        EvaluationReport {
            summary: EvaluationSummary::from_records(&records),
            detailed_evaluations: records,
        }
    }

    /// Write the report as pretty JSON.
    pub fn export_report(&self, path: &Path) -> Result<()> {
        let report = self.report();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        tracing::info!(
            path = %path.display(),
            evaluations = report.summary.total_evaluations,
            "exported evaluation report"
        );
        Ok(())
    }

    pub fn load_report(path: &Path) -> Result<EvaluationReport> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Ask for three concrete improvements, focused on the weakest scores.
    pub async fn suggest_improvements(&self, record: &EvaluationRecord) -> Result<String> {
        let improvement_prompt = prompt::improvement_prompt(&record.scores);
        self.generator
            .generate_text(&improvement_prompt, Some(SYSTEM_IMPROVEMENT))
            .await
    }
}
