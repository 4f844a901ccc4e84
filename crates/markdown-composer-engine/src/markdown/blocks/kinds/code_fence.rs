#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceSig {
    Backticks,
    Tildes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

pub struct CodeFence;

impl CodeFence {
    pub const BACKTICKS: &'static str = "```";
    pub const TILDES: &'static str = "~~~";

    pub fn sig(line: &str) -> Option<FenceSig> {
        let t = line.trim_start();
        if t.starts_with(Self::BACKTICKS) {
            Some(FenceSig::Backticks)
        } else if t.starts_with(Self::TILDES) {
            Some(FenceSig::Tildes)
        } else {
            None
        }
    }

    pub fn kind(sig: FenceSig) -> FenceKind {
        match sig {
            FenceSig::Backticks => FenceKind::Backticks,
            FenceSig::Tildes => FenceKind::Tildes,
        }
    }

    /// Info string after an opening fence, used as the code language.
    pub fn info(line: &str) -> Option<String> {
        let t = line.trim_start();
        let fence_char = t.chars().next()?;
        let info = t.trim_start_matches(fence_char).trim();
        let language = info.split_whitespace().next()?;
        Some(language.to_string())
    }

    /// A closing fence uses the opener's character and carries no info string.
    pub fn closes(kind: FenceKind, line: &str) -> bool {
        let Some(sig) = Self::sig(line) else {
            return false;
        };
        if Self::kind(sig) != kind {
            return false;
        }
        let t = line.trim();
        t.trim_start_matches(['`', '~']).is_empty()
    }

    pub fn fence(kind: FenceKind) -> &'static str {
        match kind {
            FenceKind::Backticks => Self::BACKTICKS,
            FenceKind::Tildes => Self::TILDES,
        }
    }

    /// Fence for exporting `lines`: backticks unless a line would close them.
    pub fn kind_for(lines: &[&str]) -> FenceKind {
        if lines.iter().any(|l| Self::closes(FenceKind::Backticks, l)) {
            FenceKind::Tildes
        } else {
            FenceKind::Backticks
        }
    }

    pub fn open(kind: FenceKind, language: Option<&str>) -> String {
        format!("{}{}", Self::fence(kind), language.unwrap_or_default())
    }
}
