pub struct BlockQuote;

impl BlockQuote {
    pub const PREFIX: char = '>';
    /// Prefix written in front of every exported quote line.
    pub const EXPORT_PREFIX: &'static str = "> ";

    /// Count leading `>` markers and return `(depth, content_offset)`.
    ///
    /// Spaces may precede each marker and one space after a marker belongs
    /// to it: `> a`, `>> a` and `> > a` all work.
    pub fn strip_prefixes(line: &str) -> (u8, usize) {
        let mut depth = 0u8;
        let mut offset = 0usize;
        loop {
            let rest = &line[offset..];
            let spaces = rest.len() - rest.trim_start_matches(' ').len();
            let Some(after) = rest[spaces..].strip_prefix(Self::PREFIX) else {
                break;
            };
            depth = depth.saturating_add(1);
            offset += spaces + Self::PREFIX.len_utf8();
            if after.starts_with(' ') {
                offset += 1;
            }
        }
        (depth, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain", (0, 0))]
    #[case("> quoted", (1, 2))]
    #[case(">tight", (1, 1))]
    #[case("> > nested", (2, 4))]
    #[case(">> nested", (2, 3))]
    #[case("  > indented", (1, 4))]
    #[case(">", (1, 1))]
    fn test_strip_prefixes(#[case] line: &str, #[case] expected: (u8, usize)) {
        assert_eq!(BlockQuote::strip_prefixes(line), expected);
    }
}
