use std::fmt;

/// Coarse stage of an operation, derived from the kind of the action executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    CloseCallbacks,
    UnloadScenes,
    LoadScenes,
    OpenCallbacks,
    FinishLoad,
    CustomActions,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::CloseCallbacks => "close callbacks",
            Phase::UnloadScenes => "unload scenes",
            Phase::LoadScenes => "load scenes",
            Phase::OpenCallbacks => "open callbacks",
            Phase::FinishLoad => "finish load",
            Phase::CustomActions => "custom actions",
        };
        f.write_str(name)
    }
}
