use serde::Serialize;

use crate::errors::{FolioError, Result};

/// Where the gallery is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryState {
    Locked,
    Loading,
    Ready,
    Uploading,
}

/// Inputs that move the gallery between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryEvent {
    Unlock,
    StartLoading,
    FinishLoading,
    StartUpload,
    FinishUpload,
}

impl std::fmt::Display for GalleryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Uploading => write!(f, "uploading"),
        }
    }
}

impl std::fmt::Display for GalleryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlock => write!(f, "unlock"),
            Self::StartLoading => write!(f, "start loading"),
            Self::FinishLoading => write!(f, "finish loading"),
            Self::StartUpload => write!(f, "start upload"),
            Self::FinishUpload => write!(f, "finish upload"),
        }
    }
}

impl GalleryState {
    /// The state reached by applying `event`.
    ///
    /// Failed loads and uploads also use `FinishLoading` / `FinishUpload`,
    /// so every busy state has exactly one way back to `Ready`.
    pub fn transition(self, event: GalleryEvent) -> Result<GalleryState> {
        use GalleryEvent::*;
        use GalleryState::*;

        match (self, event) {
            (Locked, Unlock) => Ok(Ready),
            (Locked, _) => Err(FolioError::Locked),
            (Ready, StartLoading) => Ok(Loading),
            (Loading, FinishLoading) => Ok(Ready),
            (Ready, StartUpload) => Ok(Uploading),
            (Uploading, FinishUpload) => Ok(Ready),
            (from, event) => Err(FolioError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            }),
        }
    }

    pub fn is_locked(self) -> bool {
        self == GalleryState::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::GalleryEvent::*;
    use super::GalleryState::*;
    use super::*;

    #[test]
    fn test_happy_paths() {
        assert_eq!(Locked.transition(Unlock).unwrap(), Ready);
        assert_eq!(Ready.transition(StartLoading).unwrap(), Loading);
        assert_eq!(Loading.transition(FinishLoading).unwrap(), Ready);
        assert_eq!(Ready.transition(StartUpload).unwrap(), Uploading);
        assert_eq!(Uploading.transition(FinishUpload).unwrap(), Ready);
    }

    #[test]
    fn test_locked_rejects_everything_but_unlock() {
        for event in [StartLoading, FinishLoading, StartUpload, FinishUpload] {
            assert!(matches!(Locked.transition(event), Err(FolioError::Locked)));
        }
    }

    #[test]
    fn test_busy_states_reject_overlap() {
        assert!(matches!(
            Loading.transition(StartUpload),
            Err(FolioError::InvalidTransition { .. })
        ));
        assert!(matches!(
            Uploading.transition(StartLoading),
            Err(FolioError::InvalidTransition { .. })
        ));
        assert!(matches!(
            Ready.transition(Unlock),
            Err(FolioError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_predicates() {
        assert!(Locked.is_locked());
        assert!(!Ready.is_locked());
        assert!(!Uploading.is_locked());
    }
}
