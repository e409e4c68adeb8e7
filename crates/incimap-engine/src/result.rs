//! Filter pass result types.

use serde::Serialize;

use crate::record::Record;

/// The outcome of one filter pass.
///
/// `errored` distinguishes "the search expression failed" from "the filters
/// legitimately matched nothing": on an evaluation error the pass is aborted
/// and `records` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    /// Records satisfying every active filter, input order preserved.
    pub records: Vec<Record>,
    /// `true` when an expression evaluation aborted the pass.
    pub errored: bool,
    /// Message from the failed expression, when errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilterResult {
    pub(crate) fn ok(records: Vec<Record>) -> Self {
        FilterResult {
            records,
            errored: false,
            error: None,
        }
    }

    pub(crate) fn errored(message: String) -> Self {
        FilterResult {
            records: Vec::new(),
            errored: true,
            error: Some(message),
        }
    }
}
