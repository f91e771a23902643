//! License: clarity of the license and its compatibility with LGPL-2.1

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use model_audit_fetch::{Bucket, Taxonomy};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::{markdown_section, Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct LicenseEvaluator;

pub fn taxonomy() -> Taxonomy {
    Taxonomy {
        name: "license".to_string(),
        instructions: "You review the license information of a machine learning model. \
                       Judge whether the license is clearly stated and whether it is \
                       compatible with the LGPL-2.1."
            .to_string(),
        buckets: vec![
            Bucket::new(
                "compatible",
                1.0,
                "a clearly stated license that is compatible with LGPL-2.1 (MIT, Apache-2.0, BSD, LGPL)",
            ),
            Bucket::new(
                "osi_uncertain",
                0.75,
                "a clearly stated OSI-approved license whose LGPL-2.1 compatibility is uncertain",
            ),
            Bucket::new(
                "unclear",
                0.5,
                "an unclear, custom or uncommon license",
            ),
            Bucket::new(
                "incompatible",
                0.0,
                "no license, a proprietary or non-commercial license, or one incompatible with LGPL-2.1",
            ),
        ],
    }
}

struct Keywords {
    compatible: Regex,
    incompatible: Regex,
    osi: Regex,
}

fn keywords() -> Option<&'static Keywords> {
    static KEYWORDS: OnceLock<Option<Keywords>> = OnceLock::new();
    KEYWORDS
        .get_or_init(|| {
            Some(Keywords {
                compatible: Regex::new(
                    r"(?i)\b(mit|apache|bsd|lgpl|mpl|isc|cc0|unlicense|zlib|bsl-1\.0)\b",
                )
                .ok()?,
                incompatible: Regex::new(
                    r"(?i)(\bagpl|\bgpl-?v?3|\bgnu general public license v3|non-?commercial|cc-by-nc|\bproprietary\b|all rights reserved|openrail|llama\s*\d*\s*community license)",
                )
                .ok()?,
                osi: Regex::new(r"(?i)\b(gpl|epl|cddl|cc-by|artistic|eupl)").ok()?,
            })
        })
        .as_ref()
}

/// Keyword classification used when the classifier is unavailable
pub fn heuristic_score(text: &str) -> f64 {
    let Some(k) = keywords() else {
        return 0.5;
    };
    // LGPL mentions would otherwise trip the GPL-3 pattern
    let without_lgpl = text.to_ascii_lowercase().replace("lgpl", "");
    if k.incompatible.is_match(&without_lgpl) {
        0.0
    } else if k.compatible.is_match(text) {
        1.0
    } else if k.osi.is_match(text) {
        0.75
    } else {
        0.5
    }
}

/// License text from card metadata, the linked code repository and the README
pub fn license_text(snapshot: &MetadataSnapshot) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(declared) = snapshot.license.as_deref() {
        parts.push(declared);
    }
    if let Some(code_license) = snapshot.code.as_ref().and_then(|c| c.license.as_deref()) {
        parts.push(code_license);
    }
    if let Some(section) = snapshot
        .readme
        .as_deref()
        .and_then(|readme| markdown_section(readme, "license"))
    {
        parts.push(section);
    }
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Evaluator for LicenseEvaluator {
    fn name(&self) -> MetricName {
        MetricName::License
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let text = license_text(snapshot);
        if text.is_empty() {
            return Ok(Outcome::full(0.0).with_note("no license information"));
        }

        match ctx.classify(&text, &taxonomy()).await {
            Ok(c) => {
                debug!(bucket = %c.bucket, confidence = c.confidence, "License classified");
                Ok(Outcome::full(c.score).with_note(c.bucket))
            }
            Err(err) => {
                warn!(error = %err, "License classifier unavailable, using keywords");
                Ok(Outcome::degraded(
                    heuristic_score(&text),
                    format!("keyword heuristic: {}", err),
                ))
            }
        }
    }
}
