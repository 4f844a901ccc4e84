use xi_rope::Rope;

use super::span::Span;

/// One source line.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// Span of the line including its terminator.
    pub span: Span,
    /// Line content without `\n` or `\r\n`.
    pub text: String,
}

/// Lines of `rope` with their byte spans.
///
/// Built on `lines_raw` so spans stay contiguous across terminators.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    rope.lines_raw(..).map(move |raw| {
        let start = offset;
        offset += raw.len();
        LineRef {
            span: Span::new(start, offset),
            text: raw.trim_end_matches(['\r', '\n']).to_string(),
        }
    })
}
