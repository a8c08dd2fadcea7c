//! FreeD wire protocol: profile layouts and the datagram decoder

pub mod decoder;
pub mod layout;

pub use decoder::{PacketDecoder, Position, RawTelemetry, hex_preview};
pub use layout::{
    AngleEncoding, FREED_ANGLE_DIVISOR, FREED_ZOOM_FULL_SCALE, FieldSpec, PacketLayout,
    PositionFields, Profile, ZoomField,
};
