// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Failures that indicate a front-end/pipeline mismatch rather than an
/// authoring mistake. These abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// A node is missing the children its kind requires.
    #[error("malformed {node} node in {rule}: {detail}")]
    ShapeMismatch {
        rule: String,
        node: &'static str,
        detail: String,
    },

    /// Helper expansion nested deeper than the evaluator allows.
    #[error("helper expansion exceeded {limit} frames in {rule} (at ${helper})")]
    HelperRecursion {
        rule: String,
        helper: String,
        limit: usize,
    },

    /// A backend met a node it has no rendering for.
    #[error("{backend} backend cannot render {node} in {rule}: {detail}")]
    Unrenderable {
        backend: &'static str,
        node: &'static str,
        rule: String,
        detail: String,
    },
}
