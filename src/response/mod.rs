//! Provider response post-processing.
//!
//! A post-processor maps one raw response to `(grades, usage)`. Grade
//! parsing is best effort by default: content without a parseable JSON
//! object yields an empty grade map. Missing `usage` or content is always
//! an error, since the completion function is expected to guarantee the
//! response shape.

mod extract;
mod grade;
mod processor;

pub use extract::{extract_json_object, parse_grades};
pub use grade::{Grade, GradeValue, Grades};
pub use processor::{
    ChatCompletionPostProcessor, MessagesPostProcessor, PostProcess, ProcessedResponse,
    ResponseError, ResponseResult,
};
