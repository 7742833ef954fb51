//! A single call into the formatting engine.

use tracing::trace;

use crate::engine::{EngineError, Formatted, Formatter};
use crate::eol::visualize_end_of_line;
use crate::options::OptionSet;
use crate::placeholder::{insert_cursor, Placeholders};

#[derive(Debug, Clone, PartialEq)]
pub struct FormatResult {
    /// `output_with_cursor` differs from `input_with_cursor`
    pub changed: bool,
    /// The options actually sent, placeholder offsets included
    pub options: OptionSet,
    /// The text sent, placeholders stripped
    pub input: String,
    pub input_with_cursor: String,
    pub output: String,
    pub output_with_cursor: String,
    /// `output_with_cursor` with `\r\n` and `\r` spelled out
    pub eol_visualized_output: String,
}

/// Format `text`, moving any placeholders it contains into the options first
pub fn format(
    engine: &dyn Formatter,
    text: &str,
    options: &OptionSet,
) -> Result<FormatResult, EngineError> {
    let (input, placeholders) = Placeholders::decode(text);
    let options = options.with_placeholders(placeholders);
    let input_with_cursor = insert_cursor(&input, options.cursor_offset);

    trace!(parser = ?options.parser, len = input.len(), "Formatting");
    let Formatted {
        formatted: output,
        cursor_offset,
    } = engine.format_with_cursor(&input, &options)?;

    let output_with_cursor = insert_cursor(&output, cursor_offset);
    let eol_visualized_output = visualize_end_of_line(&output_with_cursor);
    let changed = output_with_cursor != input_with_cursor;

    Ok(FormatResult {
        changed,
        options,
        input,
        input_with_cursor,
        output,
        output_with_cursor,
        eol_visualized_output,
    })
}
