//! FreeD datagram decoder
//!
//! Pure conversion from a received payload to [`RawTelemetry`]. The decoder
//! holds only its validated [`PacketLayout`]; it keeps no state between packets.

use super::layout::{FieldSpec, PacketLayout, Profile, ZoomField};
use crate::error::{DecodeError, Result};
use std::fmt::Write;

/// Camera position in meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One decoded telemetry frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTelemetry {
    /// Pan in device units
    pub pan_raw: i32,
    /// Tilt in device units
    pub tilt_raw: i32,
    /// Zoom encoder value (0..=0x400000 on calibrated lenses)
    pub zoom_raw: u32,
    /// Pan converted to degrees
    pub pan_deg: f64,
    /// Tilt converted to degrees (before bias correction)
    pub tilt_deg: f64,
    /// Position, when the profile carries one
    pub position: Option<Position>,
}

/// Stateless FreeD decoder bound to one layout
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    layout: PacketLayout,
}

impl PacketDecoder {
    /// Create a decoder for a custom layout.
    ///
    /// Fails with [`Error::InvalidLayout`](crate::error::Error::InvalidLayout)
    /// if any field falls outside the minimum frame length.
    pub fn new(layout: PacketLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { layout })
    }

    /// Decoder for a built-in profile
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            layout: PacketLayout::for_profile(profile),
        }
    }

    pub fn layout(&self) -> &PacketLayout {
        &self.layout
    }

    /// Decode a single datagram.
    ///
    /// Bytes past the minimum frame length are ignored.
    pub fn decode(&self, data: &[u8]) -> std::result::Result<RawTelemetry, DecodeError> {
        let layout = &self.layout;
        if data.len() < layout.min_length {
            return Err(DecodeError::TooShort {
                len: data.len(),
                min: layout.min_length,
            });
        }

        let pan_raw = to_i32("pan", read_field(data, &layout.pan, "pan")?)?;
        let tilt_raw = to_i32("tilt", read_field(data, &layout.tilt, "tilt")?)?;
        let zoom_raw = read_zoom(data, &layout.zoom)?;

        let pan_deg = finite("pan", layout.pan_encoding.to_degrees(pan_raw))?;
        let tilt_deg = finite("tilt", layout.tilt_encoding.to_degrees(tilt_raw))?;

        let position = match &layout.position {
            Some(fields) => {
                let x = read_field(data, &fields.x, "x")? as f64 / fields.divisor;
                let y = read_field(data, &fields.y, "y")? as f64 / fields.divisor;
                let z = read_field(data, &fields.z, "z")? as f64 / fields.divisor;
                Some(Position {
                    x: finite("x", x)?,
                    y: finite("y", y)?,
                    z: finite("z", z)?,
                })
            }
            None => None,
        };

        Ok(RawTelemetry {
            pan_raw,
            tilt_raw,
            zoom_raw,
            pan_deg,
            tilt_deg,
            position,
        })
    }
}

/// Read a big-endian integer, sign-extending when the field is signed
fn read_field(
    data: &[u8],
    spec: &FieldSpec,
    field: &'static str,
) -> std::result::Result<i64, DecodeError> {
    let end = spec
        .offset
        .checked_add(spec.width)
        .ok_or_else(|| malformed(field, "offset overflow".to_string()))?;
    let bytes = data.get(spec.offset..end).ok_or_else(|| {
        malformed(
            field,
            format!(
                "bytes {}..{} outside {}-byte packet",
                spec.offset,
                end,
                data.len()
            ),
        )
    })?;
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(malformed(field, format!("unsupported width {}", bytes.len())));
    }

    let value = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let bits = bytes.len() as u32 * 8;
    if spec.signed && value & (1 << (bits - 1)) != 0 {
        Ok(value as i64 - (1i64 << bits))
    } else {
        Ok(value as i64)
    }
}

fn read_zoom(data: &[u8], zoom: &ZoomField) -> std::result::Result<u32, DecodeError> {
    match *zoom {
        ZoomField::BigEndian(spec) => {
            let value = read_field(data, &spec, "zoom")?;
            u32::try_from(value).map_err(|_| malformed("zoom", format!("{} is negative", value)))
        }
        ZoomField::Packed { high, mid, low } => {
            let byte = |idx: usize| {
                data.get(idx).copied().ok_or_else(|| {
                    malformed("zoom", format!("byte {} outside {}-byte packet", idx, data.len()))
                })
            };
            Ok(((byte(high)? as u32) << 16) | ((byte(mid)? as u32) << 8) | byte(low)? as u32)
        }
    }
}

fn to_i32(field: &'static str, value: i64) -> std::result::Result<i32, DecodeError> {
    i32::try_from(value).map_err(|_| malformed(field, format!("{} does not fit in i32", value)))
}

fn finite(field: &'static str, value: f64) -> std::result::Result<f64, DecodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(malformed(field, format!("scaled value is {}", value)))
    }
}

fn malformed(field: &'static str, reason: String) -> DecodeError {
    DecodeError::MalformedField { field, reason }
}

/// Hex dump of up to `max` bytes for log messages
pub fn hex_preview(data: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(max.min(data.len()) * 3);
    for (i, byte) in data.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", byte);
    }
    if data.len() > max {
        out.push_str(" ..");
    }
    out
}
