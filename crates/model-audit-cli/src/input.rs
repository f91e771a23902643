//! URL file parsing
//!
//! Each non-empty line that does not start with `#` is either a single model
//! URL or a `code,dataset,model` triple where empty fields mean "not linked".
//! A line without its own dataset is offered the most recent dataset seen
//! earlier in the file; the fetcher adopts it only if the README mentions it.

use model_audit_core::{EvaluationRequest, ModelReference, ReferenceError};
use thiserror::Error;

/// A line that could not be turned into a request
#[derive(Error, Debug)]
pub enum InputError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Expected a URL or a code,dataset,model triple, found {fields} fields")]
    Shape { fields: usize },

    #[error("Triple has no model URL")]
    MissingModel,
}

/// One parsed line of input
#[derive(Debug)]
pub struct InputLine {
    /// Text used to identify the line in output
    pub url: String,
    pub request: Result<EvaluationRequest, InputError>,
}

/// Parse a whole URL file, carrying the last dataset forward
pub fn parse_lines(text: &str) -> Vec<InputLine> {
    let mut shared: Option<ModelReference> = None;
    let mut lines = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let request = parse_line(line).map(|request| {
            if let Some(dataset) = &request.dataset {
                shared = Some(dataset.clone());
                request
            } else {
                match &shared {
                    Some(dataset) => request.with_shared_dataset(dataset.clone()),
                    None => request,
                }
            }
        });
        lines.push(InputLine {
            url: display_url(line),
            request,
        });
    }
    lines
}

/// Parse a single non-comment line
pub fn parse_line(line: &str) -> Result<EvaluationRequest, InputError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [model] => Ok(EvaluationRequest::new(ModelReference::parse(model)?)),
        [code, dataset, model] => {
            if model.is_empty() {
                return Err(InputError::MissingModel);
            }
            let mut request = EvaluationRequest::new(ModelReference::parse(model)?);
            if let Some(code) = optional(code)? {
                request = request.with_code(code);
            }
            if let Some(dataset) = optional(dataset)? {
                request = request.with_dataset(dataset);
            }
            Ok(request)
        }
        other => Err(InputError::Shape {
            fields: other.len(),
        }),
    }
}

fn optional(field: &str) -> Result<Option<ModelReference>, ReferenceError> {
    if field.is_empty() {
        Ok(None)
    } else {
        ModelReference::parse(field).map(Some)
    }
}

/// The model URL of a line, or the line itself when it has no clear model field
fn display_url(line: &str) -> String {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [_, _, model] if !model.is_empty() => model.to_string(),
        _ => line.to_string(),
    }
}
