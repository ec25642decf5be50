use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Comment => "comments",
        }
    }

    /// Capitalized plural, as printed in the deletion summary.
    pub fn title_plural(&self) -> &'static str {
        match self {
            ContentKind::Post => "Posts",
            ContentKind::Comment => "Comments",
        }
    }

    /// Reddit "thing" prefix used to build fullnames.
    pub fn fullname_prefix(&self) -> &'static str {
        match self {
            ContentKind::Post => "t3",
            ContentKind::Comment => "t1",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Cancelled,
    EnumerationFailed,
}

/// Tally for one deletion pass over a single content kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub kind: ContentKind,
    pub deleted: usize,
    pub failed: usize,
    pub stop_reason: StopReason,
}

impl DeletionReport {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            deleted: 0,
            failed: 0,
            stop_reason: StopReason::Completed,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }
}
