//! FreeD packet layouts
//!
//! Three incompatible byte layouts are in use across deployments. Rather than
//! keeping one decoder per variant, each variant is a [`PacketLayout`] table
//! (offsets, widths, signedness and scaling) selected by [`Profile`].
//!
//! ```text
//! Profile A (26 bytes)          Profile B (26 bytes)          Profile C (29 bytes)
//! ┌───────┬────────────────┐    ┌───────┬────────────────┐    ┌────────┬───────────────┐
//! │ 2..5  │ pan  (i24)     │    │ 3..6  │ pan  (i24)     │    │ 0..3   │ pan  (i24, °) │
//! │ 5..8  │ tilt (i24)     │    │ 6..9  │ tilt (i24)     │    │ 3..6   │ tilt (i24, °) │
//! │ 21,22,│ zoom (3 bytes, │    │ 21..24│ zoom (u24)     │    │ 6..9   │ zoom (u24)    │
//! │ 23    │  MSB first)    │    │       │                │    │ 9..18  │ x,y,z (i24,mm)│
//! └───────┴────────────────┘    └───────┴────────────────┘    └────────┴───────────────┘
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Divisor mapping a normalized FreeD angle to the unit interval.
pub const FREED_ANGLE_DIVISOR: f64 = 32768.0;

/// Full-scale raw zoom value reported by the lens encoder.
pub const FREED_ZOOM_FULL_SCALE: u32 = 0x40_0000;

/// Position fields are transmitted in millimeters.
const MILLIMETERS_PER_METER: f64 = 1000.0;

/// Named wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// D0-style frame: pan/tilt at bytes 2/5, tilt scaled to ±90°, zoom assembled from three bytes
    A,
    /// Pan/tilt at bytes 3/6, tilt scaled to ±120°, zoom as a 24-bit big-endian integer
    #[default]
    B,
    /// Compact frame: angles in whole degrees followed by zoom and x/y/z position
    C,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::A => write!(f, "A"),
            Profile::B => write!(f, "B"),
            Profile::C => write!(f, "C"),
        }
    }
}

/// Location and encoding of one big-endian integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Byte offset of the most significant byte
    pub offset: usize,
    /// Width in bytes (1-4)
    pub width: usize,
    /// Two's complement when true
    pub signed: bool,
}

impl FieldSpec {
    /// Signed 24-bit field
    pub const fn i24(offset: usize) -> Self {
        Self {
            offset,
            width: 3,
            signed: true,
        }
    }

    /// Unsigned 24-bit field
    pub const fn u24(offset: usize) -> Self {
        Self {
            offset,
            width: 3,
            signed: false,
        }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.width)
    }
}

/// How an angle field maps to degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleEncoding {
    /// `raw / 32768 * scale_deg`
    Normalized { scale_deg: f64 },
    /// Raw value already in degrees
    Degrees,
}

impl AngleEncoding {
    /// Convert a raw field value to degrees
    #[inline]
    pub fn to_degrees(&self, raw: i32) -> f64 {
        match *self {
            AngleEncoding::Normalized { scale_deg } => raw as f64 / FREED_ANGLE_DIVISOR * scale_deg,
            AngleEncoding::Degrees => raw as f64,
        }
    }
}

/// How the zoom value is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomField {
    /// Contiguous big-endian unsigned integer
    BigEndian(FieldSpec),
    /// Three independently addressed bytes, combined MSB first
    Packed { high: usize, mid: usize, low: usize },
}

impl ZoomField {
    fn end(&self) -> usize {
        match *self {
            ZoomField::BigEndian(spec) => spec.end(),
            ZoomField::Packed { high, mid, low } => high.max(mid).max(low) + 1,
        }
    }
}

/// Spatial position fields (profile C only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFields {
    pub x: FieldSpec,
    pub y: FieldSpec,
    pub z: FieldSpec,
    /// Raw units per meter
    pub divisor: f64,
}

/// Complete byte layout and scaling for one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketLayout {
    /// Profile this layout was derived from
    pub profile: Profile,
    /// Shortest datagram accepted
    pub min_length: usize,
    pub pan: FieldSpec,
    pub tilt: FieldSpec,
    pub pan_encoding: AngleEncoding,
    pub tilt_encoding: AngleEncoding,
    pub zoom: ZoomField,
    pub position: Option<PositionFields>,
}

impl PacketLayout {
    /// Built-in layout for a profile
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::A => Self {
                profile,
                min_length: 26,
                pan: FieldSpec::i24(2),
                tilt: FieldSpec::i24(5),
                pan_encoding: AngleEncoding::Normalized { scale_deg: 180.0 },
                tilt_encoding: AngleEncoding::Normalized { scale_deg: 90.0 },
                zoom: ZoomField::Packed {
                    high: 21,
                    mid: 22,
                    low: 23,
                },
                position: None,
            },
            Profile::B => Self {
                profile,
                min_length: 26,
                pan: FieldSpec::i24(3),
                tilt: FieldSpec::i24(6),
                pan_encoding: AngleEncoding::Normalized { scale_deg: 180.0 },
                tilt_encoding: AngleEncoding::Normalized { scale_deg: 120.0 },
                zoom: ZoomField::BigEndian(FieldSpec::u24(21)),
                position: None,
            },
            Profile::C => Self {
                profile,
                min_length: 29,
                pan: FieldSpec::i24(0),
                tilt: FieldSpec::i24(3),
                pan_encoding: AngleEncoding::Degrees,
                tilt_encoding: AngleEncoding::Degrees,
                zoom: ZoomField::BigEndian(FieldSpec::u24(6)),
                position: Some(PositionFields {
                    x: FieldSpec::i24(9),
                    y: FieldSpec::i24(12),
                    z: FieldSpec::i24(15),
                    divisor: MILLIMETERS_PER_METER,
                }),
            },
        }
    }

    /// Apply deployment overrides.
    ///
    /// A scale override switches the axis to normalized encoding even on
    /// profiles that transmit plain degrees.
    pub fn with_overrides(
        mut self,
        min_length: Option<usize>,
        pan_scale: Option<f64>,
        tilt_scale: Option<f64>,
    ) -> Self {
        if let Some(len) = min_length {
            self.min_length = len;
        }
        if let Some(scale_deg) = pan_scale {
            self.pan_encoding = AngleEncoding::Normalized { scale_deg };
        }
        if let Some(scale_deg) = tilt_scale {
            self.tilt_encoding = AngleEncoding::Normalized { scale_deg };
        }
        self
    }

    /// Check that every declared field fits inside the minimum frame and
    /// that angle scales are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, encoding) in [("pan", self.pan_encoding), ("tilt", self.tilt_encoding)] {
            if let AngleEncoding::Normalized { scale_deg } = encoding
                && (!scale_deg.is_finite() || scale_deg == 0.0)
            {
                return Err(Error::InvalidLayout(format!(
                    "{} scale must be finite and non-zero, got {}",
                    name, scale_deg
                )));
            }
        }

        let mut fields = vec![("pan", self.pan), ("tilt", self.tilt)];
        if let ZoomField::BigEndian(spec) = self.zoom {
            fields.push(("zoom", spec));
        }
        if let Some(pos) = &self.position {
            fields.extend([("x", pos.x), ("y", pos.y), ("z", pos.z)]);
            if !pos.divisor.is_finite() || pos.divisor == 0.0 {
                return Err(Error::InvalidLayout(format!(
                    "position divisor must be finite and non-zero, got {}",
                    pos.divisor
                )));
            }
        }

        for (name, spec) in fields {
            if spec.width == 0 || spec.width > 4 {
                return Err(Error::InvalidLayout(format!(
                    "field '{}' has unsupported width {}",
                    name, spec.width
                )));
            }
            if spec.end() > self.min_length {
                return Err(Error::InvalidLayout(format!(
                    "field '{}' ends at byte {} but profile {} frames are only {} bytes",
                    name,
                    spec.end(),
                    self.profile,
                    self.min_length
                )));
            }
        }

        if self.zoom.end() > self.min_length {
            return Err(Error::InvalidLayout(format!(
                "zoom ends at byte {} but profile {} frames are only {} bytes",
                self.zoom.end(),
                self.profile,
                self.min_length
            )));
        }

        Ok(())
    }
}
