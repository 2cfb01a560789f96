//! Decoding of the `functions-by-sector` response, which the backend returns either as a
//! bare array or wrapped in a page envelope.

use serde_json::Value;

use super::catalog::FunctionId;
use super::domain::JobFunction;

/// Response body matched none of the recognized listing shapes.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized function listing shape ({shape})")]
pub struct MalformedResponseShape {
    pub shape: &'static str,
}

/// Listing element that could not be decoded into a job function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFunction {
    pub index: usize,
    pub function_id: Option<FunctionId>,
    pub reason: String,
}

/// Functions decoded from a recognized listing, plus the elements that were skipped.
#[derive(Debug, Default)]
pub struct DecodedListing {
    pub functions: Vec<JobFunction>,
    pub rejected: Vec<RejectedFunction>,
}

/// Recognizes the listing shape first, then decodes each element on its own so one bad
/// function never hides the rest of its sector.
pub fn decode_function_listing(body: Value) -> Result<DecodedListing, MalformedResponseShape> {
    let elements = match body {
        Value::Array(elements) => elements,
        Value::Object(mut page) => match page.remove("content") {
            Some(Value::Array(elements)) => elements,
            Some(_) => {
                return Err(MalformedResponseShape {
                    shape: "page with non-array content",
                })
            }
            None => {
                return Err(MalformedResponseShape {
                    shape: "object without content",
                })
            }
        },
        other => {
            return Err(MalformedResponseShape {
                shape: describe(&other),
            })
        }
    };

    let mut listing = DecodedListing::default();
    for (index, element) in elements.into_iter().enumerate() {
        let function_id = element.get("id").and_then(Value::as_u64).map(FunctionId);
        match serde_json::from_value::<JobFunction>(element) {
            Ok(function) => listing.functions.push(function),
            Err(error) => listing.rejected.push(RejectedFunction {
                index,
                function_id,
                reason: error.to_string(),
            }),
        }
    }
    Ok(listing)
}

pub fn decode_function(body: Value) -> Result<JobFunction, serde_json::Error> {
    serde_json::from_value(body)
}

fn describe(body: &Value) -> &'static str {
    match body {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
