//! Payload validation for the poll admin endpoints.
//!
//! Bodies arrive as raw bytes and leave as sanitized, typed requests or as an
//! ordered list of [`Violation`]s. Shape (JSON types) is checked first so each
//! type error names its field; the bounds are declared with `validator`
//! attributes on the input structs below.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidateLength, ValidationError, ValidationErrors};

use crate::models::{CreatePollRequest, UpdatePollRequest};

const OPTION_LABEL_MIN: u64 = 1;
const OPTION_LABEL_MAX: u64 = 100;

/// Violation
///
/// One broken rule: which field, a machine-readable code and a readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Violation {
    /// Field path, e.g. `question`, `options` or `options[2]`.
    pub field: String,
    /// One of `invalid_json`, `invalid_type`, `required`, `too_small`, `too_big`.
    pub code: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

// --- Schemas ---

#[derive(Clone, Copy)]
enum Shape {
    Text,
    TextList,
}

/// Declared field order; violations are reported in this order.
const POLL_FIELDS: [(&str, Shape); 2] = [("question", Shape::Text), ("options", Shape::TextList)];

#[derive(Debug, Deserialize, Validate)]
struct CreatePollInput {
    #[validate(required, length(min = 5, max = 300))]
    question: Option<String>,
    #[validate(required, length(min = 2, max = 10))]
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdatePollInput {
    #[validate(length(min = 5, max = 300))]
    question: Option<String>,
    #[validate(length(min = 2, max = 10))]
    options: Option<Vec<String>>,
}

trait PollInput: DeserializeOwned + Validate {
    fn question_mut(&mut self) -> Option<&mut String>;
    fn options(&self) -> Option<&[String]>;
}

impl PollInput for CreatePollInput {
    fn question_mut(&mut self) -> Option<&mut String> {
        self.question.as_mut()
    }
    fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }
}

impl PollInput for UpdatePollInput {
    fn question_mut(&mut self) -> Option<&mut String> {
        self.question.as_mut()
    }
    fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }
}

// --- Entry Points ---

/// Validates a create body. Both `question` and `options` are required.
pub fn create_payload(body: &[u8]) -> Result<CreatePollRequest, Vec<Violation>> {
    let input: CreatePollInput = parse(body)?;
    match (input.question, input.options) {
        (Some(question), Some(options)) => Ok(CreatePollRequest { question, options }),
        (question, _) => Err(vec![Violation::new(
            if question.is_none() { "question" } else { "options" },
            "required",
            "is required",
        )]),
    }
}

/// Validates an update body. Every field is optional; `{}` is a valid no-op.
pub fn update_payload(body: &[u8]) -> Result<UpdatePollRequest, Vec<Violation>> {
    let input: UpdatePollInput = parse(body)?;
    Ok(UpdatePollRequest {
        question: input.question,
        options: input.options,
    })
}

fn parse<I: PollInput>(body: &[u8]) -> Result<I, Vec<Violation>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| vec![Violation::new("body", "invalid_json", e.to_string())])?;

    let Value::Object(object) = &value else {
        return Err(vec![Violation::new(
            "body",
            "invalid_type",
            "expected a JSON object",
        )]);
    };

    let shape_violations = check_shapes(object);
    if !shape_violations.is_empty() {
        return Err(shape_violations);
    }

    let mut input: I = serde_json::from_value(value)
        .map_err(|e| vec![Violation::new("body", "invalid_type", e.to_string())])?;

    // Bounds apply to the trimmed question.
    if let Some(question) = input.question_mut() {
        *question = question.trim().to_string();
    }

    let violations = collect_violations(&input);
    if violations.is_empty() {
        Ok(input)
    } else {
        Err(violations)
    }
}

fn check_shapes(object: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (field, shape) in POLL_FIELDS {
        let Some(value) = object.get(field) else {
            continue;
        };
        match (shape, value) {
            (Shape::Text, Value::String(_)) => {}
            (Shape::Text, _) => {
                violations.push(Violation::new(field, "invalid_type", "expected a string"));
            }
            (Shape::TextList, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        violations.push(Violation::new(
                            format!("{field}[{index}]"),
                            "invalid_type",
                            "expected a string",
                        ));
                    }
                }
            }
            (Shape::TextList, _) => {
                violations.push(Violation::new(
                    field,
                    "invalid_type",
                    "expected an array of strings",
                ));
            }
        }
    }

    violations
}

fn collect_violations<I: PollInput>(input: &I) -> Vec<Violation> {
    let errors = input.validate().err().unwrap_or_else(ValidationErrors::new);
    let field_errors = errors.field_errors();
    let mut violations = Vec::new();

    for (field, _) in POLL_FIELDS {
        if let Some(errors) = field_errors.get(field) {
            violations.extend(errors.iter().map(|error| describe(field, error)));
        }
        if field == "options" {
            violations.extend(option_label_violations(input.options().unwrap_or_default()));
        }
    }

    violations
}

fn option_label_violations(labels: &[String]) -> Vec<Violation> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| !label.validate_length(Some(OPTION_LABEL_MIN), Some(OPTION_LABEL_MAX), None))
        .map(|(index, label)| {
            let field = format!("options[{index}]");
            if (label.chars().count() as u64) < OPTION_LABEL_MIN {
                Violation::new(
                    field,
                    "too_small",
                    format!("must contain at least {OPTION_LABEL_MIN} character(s)"),
                )
            } else {
                Violation::new(
                    field,
                    "too_big",
                    format!("must contain at most {OPTION_LABEL_MAX} character(s)"),
                )
            }
        })
        .collect()
}

/// Maps a `validator` error to a violation, telling "too short" from "too long".
fn describe(field: &str, error: &ValidationError) -> Violation {
    if error.code == "required" {
        return Violation::new(field, "required", "is required");
    }

    let bound = |key: &str| error.params.get(key).and_then(Value::as_u64);
    let (actual, unit) = match error.params.get("value") {
        Some(Value::String(text)) => (text.chars().count() as u64, "character(s)"),
        Some(Value::Array(items)) => (items.len() as u64, "entries"),
        _ => (0, "item(s)"),
    };

    match (bound("min"), bound("max")) {
        (Some(min), _) if actual < min => {
            Violation::new(field, "too_small", format!("must contain at least {min} {unit}"))
        }
        (_, Some(max)) if actual > max => {
            Violation::new(field, "too_big", format!("must contain at most {max} {unit}"))
        }
        _ => Violation::new(field, &error.code, "is invalid"),
    }
}
