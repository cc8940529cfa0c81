//! Physical orientations reported by the accelerometer and the display
//! transforms they map to.

use std::fmt;

/// Device orientation as reported by the sensor service.
///
/// `Undefined` covers every label the daemon does not recognise; it never
/// triggers an actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Undefined,
    Normal,
    RightUp,
    LeftUp,
    BottomUp,
}

impl Orientation {
    /// Maps a sensor label onto an orientation.
    ///
    /// Matching is exact: `"Normal"`, `" normal"` and `""` are all
    /// `Undefined`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "normal" => Self::Normal,
            "bottom-up" => Self::BottomUp,
            "left-up" => Self::LeftUp,
            "right-up" => Self::RightUp,
            _ => Self::Undefined,
        }
    }

    /// Wire label of a known orientation.
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::Undefined => None,
            Self::Normal => Some("normal"),
            Self::BottomUp => Some("bottom-up"),
            Self::LeftUp => Some("left-up"),
            Self::RightUp => Some("right-up"),
        }
    }

    /// Display transform that keeps the picture upright in this orientation.
    pub const fn transform(self) -> Option<Transform> {
        match self {
            Self::Undefined => None,
            Self::Normal => Some(Transform::Normal),
            Self::RightUp => Some(Transform::Rotate90),
            Self::BottomUp => Some(Transform::Rotate180),
            Self::LeftUp => Some(Transform::Rotate270),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("undefined"))
    }
}

/// Decodes a sensor label. Shared by the signal path and the one-shot read.
pub fn decode_label(label: &str) -> Orientation {
    Orientation::from_label(label)
}

/// Clockwise output rotation understood by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Transform {
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Normal => 0,
            Self::Rotate90 => 90,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}
