use serde::Serialize;

/// A label to draw for one in-view location.
///
/// Labels are recomputed from scratch on every heading update and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleLabel {
    pub text: String,
    pub bearing_deg: f64,
    pub angle_offset_deg: f64,
    /// Horizontal position (CSS `left`), pixels from the viewport's left edge.
    pub x_px: f64,
    /// Vertical position, pixels from the top. Always the viewport center.
    pub y_px: f64,
    pub distance_m: f64,
}

/// Full replacement set of labels for one heading update.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct LabelFrame {
    pub heading_deg: f64,
    pub labels: Vec<VisibleLabel>,
}

impl LabelFrame {
    pub fn empty(heading_deg: f64) -> Self {
        Self {
            heading_deg,
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.text.as_str())
    }
}
