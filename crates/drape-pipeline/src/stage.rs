//! Pipeline stage identifiers and metadata.
//!
//! A run visits the six processing stages in [`Stage::PROCESSING`] order
//! and then lands on [`Stage::Complete`] (or [`Stage::Failed`] when the
//! composition backend errors). [`Stage::Idle`] is the only initial state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a position in the try-on pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// No run is active.
    Idle,
    /// Processing stage 1: staging both images for the backend.
    Uploading,
    /// Processing stage 2: isolating the person from the background.
    Segmenting,
    /// Processing stage 3: body keypoint analysis.
    PoseDetection,
    /// Processing stage 4: extracting garment design and texture.
    GarmentExtraction,
    /// Processing stage 5: aligning the garment to the pose.
    Alignment,
    /// Processing stage 6: final draping; the composition backend runs here.
    Blending,
    /// Terminal: a result is available.
    Complete,
    /// Terminal: the composition backend failed.
    Failed,
}

/// Number of processing stages in a run.
pub const PROCESSING_COUNT: usize = 6;

/// Number of ordered positions a successful run passes through:
/// every processing stage plus [`Stage::Complete`].
pub const POSITION_COUNT: usize = PROCESSING_COUNT + 1;

/// Display status of one step relative to the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Already passed in the current run.
    Complete,
    /// The stage the run is in right now.
    Current,
    /// Not reached yet.
    Pending,
}

impl Stage {
    /// Processing stages in run order.
    pub const PROCESSING: [Self; PROCESSING_COUNT] = [
        Self::Uploading,
        Self::Segmenting,
        Self::PoseDetection,
        Self::GarmentExtraction,
        Self::Alignment,
        Self::Blending,
    ];

    /// Zero-based position among the processing stages, `None` for
    /// idle and the terminal states.
    #[must_use]
    pub const fn processing_index(self) -> Option<usize> {
        match self {
            Self::Uploading => Some(0),
            Self::Segmenting => Some(1),
            Self::PoseDetection => Some(2),
            Self::GarmentExtraction => Some(3),
            Self::Alignment => Some(4),
            Self::Blending => Some(5),
            Self::Idle | Self::Complete | Self::Failed => None,
        }
    }

    /// Map a processing index back to its stage.
    ///
    /// Returns `None` for out-of-range indices.
    #[must_use]
    pub const fn from_processing_index(index: usize) -> Option<Self> {
        if index < PROCESSING_COUNT {
            Some(Self::PROCESSING[index])
        } else {
            None
        }
    }

    /// Whether this stage is one of the six processing stages.
    #[must_use]
    pub const fn is_processing(self) -> bool {
        self.processing_index().is_some()
    }

    /// Whether a run has ended in this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// The processing stage that follows this one.
    ///
    /// `None` for [`Stage::Blending`] (which leaves only through the
    /// composition result) and for every non-processing stage.
    #[must_use]
    pub const fn next_processing(self) -> Option<Self> {
        match self.processing_index() {
            Some(i) => Self::from_processing_index(i + 1),
            None => None,
        }
    }

    /// Progress percentage set on entering this stage.
    ///
    /// Position `p` of [`POSITION_COUNT`] maps to `round(p / 7 * 100)`,
    /// so the six processing stages read 14, 29, 43, 57, 71, 86 and only
    /// [`Stage::Complete`] reaches 100. Idle and failed report 0; the
    /// failed state keeps whatever progress the run had reached instead.
    #[must_use]
    pub const fn progress_on_entry(self) -> u8 {
        let position = match self {
            Self::Complete => POSITION_COUNT,
            _ => match self.processing_index() {
                Some(i) => i + 1,
                None => return 0,
            },
        };
        percent_of_positions(position)
    }

    /// 1-based step number shown next to processing stages.
    #[must_use]
    pub const fn step_number(self) -> Option<usize> {
        match self.processing_index() {
            Some(i) => Some(i + 1),
            None => None,
        }
    }

    /// Kebab-case wire name, e.g. `"pose-detection"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Segmenting => "segmenting",
            Self::PoseDetection => "pose-detection",
            Self::GarmentExtraction => "garment-extraction",
            Self::Alignment => "alignment",
            Self::Blending => "blending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Full display label for the stage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Uploading => "Uploading Images",
            Self::Segmenting => "Person Segmentation",
            Self::PoseDetection => "Pose Detection",
            Self::GarmentExtraction => "Garment Extraction",
            Self::Alignment => "Pose Alignment",
            Self::Blending => "Final Blending",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// One-line description of the work done in the stage.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Idle => "Waiting for both images",
            Self::Uploading => "Preparing your images for processing",
            Self::Segmenting => "Isolating person from background",
            Self::PoseDetection => "Analyzing body keypoints and posture",
            Self::GarmentExtraction => "Extracting garment design and texture",
            Self::Alignment => "Aligning garment to your body pose",
            Self::Blending => "Creating realistic draping and fit",
            Self::Complete => "Your virtual try-on is ready",
            Self::Failed => "The try-on could not be composed",
        }
    }

    /// Status of this processing step while the pipeline sits in `current`.
    ///
    /// Every step reads complete once the run has completed, and pending
    /// while idle. A failed run leaves all steps but the last complete.
    #[must_use]
    pub const fn status_relative_to(self, current: Self) -> StepStatus {
        let Some(mine) = self.processing_index() else {
            return StepStatus::Pending;
        };
        let reached = match current {
            Self::Idle => return StepStatus::Pending,
            Self::Complete => return StepStatus::Complete,
            Self::Failed => PROCESSING_COUNT - 1,
            _ => match current.processing_index() {
                Some(i) => i,
                None => return StepStatus::Pending,
            },
        };
        if mine < reached {
            StepStatus::Complete
        } else if mine == reached && !matches!(current, Self::Failed) {
            StepStatus::Current
        } else {
            StepStatus::Pending
        }
    }
}

/// `round(position / POSITION_COUNT * 100)` in integer arithmetic.
#[allow(clippy::cast_possible_truncation)]
const fn percent_of_positions(position: usize) -> u8 {
    ((200 * position + POSITION_COUNT) / (2 * POSITION_COUNT)) as u8
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn processing_order_is_fixed() {
        let names: Vec<&str> = Stage::PROCESSING.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            [
                "uploading",
                "segmenting",
                "pose-detection",
                "garment-extraction",
                "alignment",
                "blending",
            ]
        );
        let mut seen = std::collections::HashSet::new();
        for stage in Stage::PROCESSING {
            assert!(seen.insert(stage), "Duplicate stage in PROCESSING: {stage}");
        }
    }

    #[test]
    fn processing_index_round_trips() {
        for (i, stage) in Stage::PROCESSING.into_iter().enumerate() {
            assert_eq!(stage.processing_index(), Some(i));
            assert_eq!(Stage::from_processing_index(i), Some(stage));
        }
        assert_eq!(Stage::from_processing_index(PROCESSING_COUNT), None);
        assert_eq!(Stage::Idle.processing_index(), None);
        assert_eq!(Stage::Complete.processing_index(), None);
        assert_eq!(Stage::Failed.processing_index(), None);
    }

    #[test]
    fn next_processing_walks_the_order_and_stops_at_blending() {
        let mut stage = Stage::Uploading;
        let mut visited = vec![stage];
        while let Some(next) = stage.next_processing() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::PROCESSING);
        assert_eq!(Stage::Idle.next_processing(), None);
        assert_eq!(Stage::Complete.next_processing(), None);
    }

    #[test]
    fn progress_reaches_100_only_on_complete() {
        let progress: Vec<u8> = Stage::PROCESSING
            .iter()
            .map(|s| s.progress_on_entry())
            .collect();
        assert_eq!(progress, [14, 29, 43, 57, 71, 86]);
        assert_eq!(Stage::Complete.progress_on_entry(), 100);
        assert_eq!(Stage::Idle.progress_on_entry(), 0);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn step_status_follows_current_stage() {
        let current = Stage::GarmentExtraction;
        assert_eq!(
            Stage::Uploading.status_relative_to(current),
            StepStatus::Complete
        );
        assert_eq!(
            Stage::GarmentExtraction.status_relative_to(current),
            StepStatus::Current
        );
        assert_eq!(
            Stage::Blending.status_relative_to(current),
            StepStatus::Pending
        );
        for stage in Stage::PROCESSING {
            assert_eq!(stage.status_relative_to(Stage::Idle), StepStatus::Pending);
            assert_eq!(
                stage.status_relative_to(Stage::Complete),
                StepStatus::Complete
            );
        }
        assert_eq!(
            Stage::Blending.status_relative_to(Stage::Failed),
            StepStatus::Pending
        );
        assert_eq!(
            Stage::Alignment.status_relative_to(Stage::Failed),
            StepStatus::Complete
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        for stage in Stage::PROCESSING {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
        let parsed: Stage = serde_json::from_str("\"pose-detection\"").unwrap();
        assert_eq!(parsed, Stage::PoseDetection);
    }

    #[test]
    fn labels_are_non_empty() {
        for stage in Stage::PROCESSING {
            assert!(!stage.label().is_empty(), "{stage} label must not be empty");
            assert!(
                !stage.description().is_empty(),
                "{stage} description must not be empty"
            );
            assert!(stage.step_number().is_some());
        }
    }
}
