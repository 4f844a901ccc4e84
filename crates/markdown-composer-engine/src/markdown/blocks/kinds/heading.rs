pub struct Heading;

impl Heading {
    pub const MARKER: char = '#';
    pub const MAX_LEVEL: u8 = 6;

    /// Level and content of an ATX heading line such as `## Title`.
    pub fn parse(line: &str) -> Option<(u8, &str)> {
        let t = line.trim_start();
        let hashes = t.len() - t.trim_start_matches(Self::MARKER).len();
        if hashes == 0 || hashes > usize::from(Self::MAX_LEVEL) {
            return None;
        }
        let rest = &t[hashes..];
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            return None;
        }
        Some((hashes as u8, rest.trim()))
    }

    pub fn prefix(level: u8) -> String {
        let mut prefix = Self::MARKER.to_string().repeat(usize::from(level));
        prefix.push(' ');
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("## Title", Some((2, "Title")))]
    #[case("# ignored", Some((1, "ignored")))]
    #[case("###", Some((3, "")))]
    #[case("#hashtag", None)]
    #[case("####### seven", None)]
    #[case("plain", None)]
    fn test_parse(#[case] line: &str, #[case] expected: Option<(u8, &str)>) {
        assert_eq!(Heading::parse(line), expected);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(Heading::prefix(2), "## ");
    }
}
