/// Log panel state for one pod. Every fetch ends in `Loaded` or `Failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogState {
    #[default]
    NotFetched,
    Loading,
    Loaded(String),
    Failed(String),
}

impl LogState {
    /// Whether expanding the panel should issue a fetch.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, LogState::NotFetched | LogState::Failed(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LogState::Loading)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            LogState::Loaded(text) => Some(text),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            LogState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}
