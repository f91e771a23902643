//! Performance claims: whether the model card backs its claims with evidence

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use model_audit_fetch::{Bucket, Taxonomy};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct PerformanceClaimsEvaluator;

pub fn taxonomy() -> Taxonomy {
    Taxonomy {
        name: "performance_claims".to_string(),
        instructions: "You read the documentation of a machine learning model. Judge how \
                       well its performance claims are supported by evidence."
            .to_string(),
        buckets: vec![
            Bucket::new(
                "concrete",
                1.0,
                "concrete numeric results, result tables or links to a paper with evaluations",
            ),
            Bucket::new(
                "benchmark_named",
                0.75,
                "benchmarks or datasets are named but no numbers are given",
            ),
            Bucket::new("vague", 0.5, "vague statements such as 'state of the art' or 'high accuracy'"),
            Bucket::new("none", 0.0, "no performance claims at all"),
        ],
    }
}

struct Lexicon {
    numeric: Regex,
    table_row: Regex,
    paper: Regex,
    benchmark: Regex,
    vague: Regex,
}

fn lexicon() -> Option<&'static Lexicon> {
    static LEXICON: OnceLock<Option<Lexicon>> = OnceLock::new();
    LEXICON
        .get_or_init(|| {
            Some(Lexicon {
                numeric: Regex::new(
                    r"(?i)(\d+(\.\d+)?\s*%|\b(accuracy|f1|bleu|rouge(-\w+)?|perplexity|exact match|wer|auc|map)\b\s*(of|=|:)?\s*\d+(\.\d+)?)",
                )
                .ok()?,
                table_row: Regex::new(r"(?m)^\s*\|.*\|\s*$\n^\s*\|\s*:?-{3,}").ok()?,
                paper: Regex::new(r"(?i)(arxiv\.org/|\barxiv:\s*\d{4}\.\d{4,5}|doi\.org/|paperswithcode\.com)").ok()?,
                benchmark: Regex::new(
                    r"(?i)\b(glue|superglue|squad|mmlu|imagenet|coco|hellaswag|humaneval|gsm8k|wmt\d*|librispeech|benchmark(s|ed)?|evaluat(ed|ion|ions))\b",
                )
                .ok()?,
                vague: Regex::new(
                    r"(?i)(state[- ]of[- ]the[- ]art|\bsota\b|high(ly)? accura|outperform|strong performance|competitive results|best[- ]in[- ]class)",
                )
                .ok()?,
            })
        })
        .as_ref()
}

/// Lexical fallback used when the classifier is unavailable
pub fn heuristic_score(readme: &str) -> f64 {
    let Some(l) = lexicon() else {
        return 0.0;
    };
    if l.numeric.is_match(readme) || l.table_row.is_match(readme) || l.paper.is_match(readme) {
        1.0
    } else if l.benchmark.is_match(readme) {
        0.75
    } else if l.vague.is_match(readme) {
        0.5
    } else {
        0.0
    }
}

#[async_trait]
impl Evaluator for PerformanceClaimsEvaluator {
    fn name(&self) -> MetricName {
        MetricName::PerformanceClaims
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let readme = snapshot
            .readme
            .as_deref()
            .ok_or_else(|| EvaluatorError::MissingData("README".to_string()))?;

        if readme.trim().is_empty() {
            return Ok(Outcome::full(0.0).with_note("empty README"));
        }

        match ctx.classify(readme, &taxonomy()).await {
            Ok(c) => {
                debug!(bucket = %c.bucket, confidence = c.confidence, "Performance claims classified");
                Ok(Outcome::full(c.score).with_note(c.bucket))
            }
            Err(err) => {
                warn!(error = %err, "Performance classifier unavailable, using lexical scan");
                Ok(Outcome::degraded(
                    heuristic_score(readme),
                    format!("lexical heuristic: {}", err),
                ))
            }
        }
    }
}
