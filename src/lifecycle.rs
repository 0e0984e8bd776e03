//! Unit lifecycle state machine.

/// Application unit lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitState {
    /// Unit has been created but not initialized.
    #[default]
    Uninitialized,
    /// Unit has been initialized with a framework reference.
    Initialized,
    /// Unit is started and accepting work.
    Started,
    /// Unit has been stopped.
    Stopped,
}

impl UnitState {
    /// Check if the unit can be started.
    ///
    /// Any state after a successful initialization qualifies, including
    /// `Stopped`: a stopped unit may be started again without being
    /// re-initialized.
    pub fn can_start(&self) -> bool {
        self.is_initialized()
    }

    /// Check if the unit can be stopped.
    pub fn can_stop(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Check if the unit has completed initialization at some point.
    ///
    /// `Started` implies `Initialized`; `Stopped` retains it.
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}
