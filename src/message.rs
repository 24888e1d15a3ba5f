//! Typed request and response messages and the datagram codec.
//!
//! Every message is one variant of [`RequestMessage`] or [`ResponseMessage`],
//! keyed by its [`MessageType`]. Both enums implement [`Message`], so the same
//! code encodes and decodes either direction; the client only ever encodes
//! requests and decodes responses, a simulated device does the opposite.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use strum_macros::{Display, FromRepr};

use crate::errors::Error;
use crate::header::{HEADER_SIZE, Header};
use crate::types::{Color, FirmwareVersion, Power, TileInfo};

type Result<T> = std::result::Result<T, Error>;

/// Width of the fixed label field.
pub const LABEL_SIZE: usize = 32;
/// Colors carried by one `StateMultiZone` message.
pub const MULTIZONE_BATCH: usize = 8;
/// Colors carried by one extended multizone message.
pub const EXTENDED_ZONES: usize = 82;
/// Pixels carried by one `Set64`/`State64` message.
pub const TILE_PIXELS: usize = 64;
/// Tiles described by one `StateDeviceChain` message.
pub const CHAIN_TILES: usize = 16;

/// Wire identifiers of every supported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, Serialize)]
#[repr(u16)]
pub enum MessageType {
    GetService = 2,
    StateService = 3,
    GetHostFirmware = 14,
    StateHostFirmware = 15,
    GetWifiInfo = 16,
    StateWifiInfo = 17,
    GetPower = 20,
    SetPower = 21,
    StatePower = 22,
    GetLabel = 23,
    SetLabel = 24,
    StateLabel = 25,
    GetVersion = 32,
    StateVersion = 33,
    Acknowledgement = 45,
    LightGet = 101,
    LightSetColor = 102,
    LightState = 107,
    LightGetPower = 116,
    LightSetPower = 117,
    LightStatePower = 118,
    SetColorZones = 501,
    GetColorZones = 502,
    StateZone = 503,
    StateMultiZone = 506,
    SetExtendedColorZones = 510,
    GetExtendedColorZones = 511,
    StateExtendedColorZones = 512,
    GetDeviceChain = 701,
    StateDeviceChain = 702,
    Get64 = 707,
    State64 = 711,
    Set64 = 715,
}

/// How a multizone setter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum ApplicationRequest {
    /// Buffer the change until a later message applies it.
    NoApply = 0,
    /// Apply this and every buffered change.
    Apply = 1,
    /// Apply buffered changes, ignoring this message's colors.
    ApplyOnly = 2,
}

/// Messages sent from a client to a device.
///
/// Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestMessage {
    GetService,
    GetHostFirmware,
    GetWifiInfo,
    GetPower,
    SetPower {
        level: Power,
    },
    GetLabel,
    SetLabel {
        label: String,
    },
    GetVersion,
    LightGet,
    LightSetColor {
        color: Color,
        duration: u32,
    },
    LightGetPower,
    LightSetPower {
        level: Power,
        duration: u32,
    },
    SetColorZones {
        start: u8,
        end: u8,
        color: Color,
        duration: u32,
        apply: ApplicationRequest,
    },
    GetColorZones {
        start: u8,
        end: u8,
    },
    /// At most [`EXTENDED_ZONES`] colors, starting at zone `index`.
    SetExtendedColorZones {
        duration: u32,
        apply: ApplicationRequest,
        index: u16,
        colors: Vec<Color>,
    },
    GetExtendedColorZones,
    GetDeviceChain,
    Get64 {
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
    },
    /// Exactly [`TILE_PIXELS`] colors on the wire; shorter vectors are padded.
    Set64 {
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
        duration: u32,
        colors: Vec<Color>,
    },
}

/// Messages sent from a device to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseMessage {
    StateService {
        service: u8,
        port: u32,
    },
    StateHostFirmware {
        build: u64,
        version: FirmwareVersion,
    },
    StateWifiInfo {
        signal: f32,
        tx: u32,
        rx: u32,
    },
    StatePower {
        level: Power,
    },
    StateLabel {
        label: String,
    },
    StateVersion {
        vendor: u32,
        product: u32,
        version: u32,
    },
    Acknowledgement,
    LightState {
        color: Color,
        power: Power,
        label: String,
    },
    LightStatePower {
        level: Power,
    },
    StateZone {
        count: u8,
        index: u8,
        color: Color,
    },
    /// Always [`MULTIZONE_BATCH`] colors; entries past `count` are padding.
    StateMultiZone {
        count: u8,
        index: u8,
        colors: Vec<Color>,
    },
    StateExtendedColorZones {
        count: u16,
        index: u16,
        colors: Vec<Color>,
    },
    StateDeviceChain {
        start_index: u8,
        tiles: Vec<TileInfo>,
        total_count: u8,
    },
    State64 {
        tile_index: u8,
        x: u8,
        y: u8,
        width: u8,
        colors: Vec<Color>,
    },
}

/// A message that can be framed into a datagram.
pub trait Message: Sized {
    fn message_type(&self) -> MessageType;

    fn write_payload(&self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Parse the payload of a message of type `message_type`.
    fn read_payload(message_type: MessageType, payload: &[u8]) -> Result<Self>;
}

/// Frame `message` behind `header`, filling in the size and type fields.
pub fn encode<M: Message>(header: &Header, message: &M) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    message
        .write_payload(&mut payload)
        .map_err(|e| Error::malformed(format!("cannot write payload: {e}")))?;

    let size = HEADER_SIZE + payload.len();
    let header = Header {
        size: u16::try_from(size)
            .map_err(|_| Error::malformed(format!("datagram of {size} bytes is too large")))?,
        message_type: message.message_type() as u16,
        ..*header
    };

    let mut out = Vec::with_capacity(size);
    header
        .pack(&mut out)
        .map_err(|e| Error::malformed(format!("cannot write header: {e}")))?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parse a datagram into its header and message.
///
/// Fails with [`Error::MalformedPacket`] if the declared size differs from
/// the datagram length, the type is unknown or the payload is truncated.
pub fn decode<M: Message>(bytes: &[u8]) -> Result<(Header, M)> {
    let header = Header::unpack(bytes)?;
    if header.size as usize != bytes.len() {
        return Err(Error::malformed(format!(
            "declared size {} but datagram has {} bytes",
            header.size,
            bytes.len()
        )));
    }
    let message_type = MessageType::from_repr(header.message_type).ok_or_else(|| {
        Error::malformed(format!("unknown message type {}", header.message_type))
    })?;
    let message = M::read_payload(message_type, &bytes[HEADER_SIZE..])?;
    Ok((header, message))
}

impl RequestMessage {
    /// Response types that answer this request.
    ///
    /// Setters are answered by an acknowledgement; `GetColorZones` may be
    /// answered by either zone state message.
    pub fn response_types(&self) -> &'static [MessageType] {
        use MessageType as T;
        match self {
            RequestMessage::GetService => &[T::StateService],
            RequestMessage::GetHostFirmware => &[T::StateHostFirmware],
            RequestMessage::GetWifiInfo => &[T::StateWifiInfo],
            RequestMessage::GetPower => &[T::StatePower],
            RequestMessage::GetLabel => &[T::StateLabel],
            RequestMessage::GetVersion => &[T::StateVersion],
            RequestMessage::LightGet => &[T::LightState],
            RequestMessage::LightGetPower => &[T::LightStatePower],
            RequestMessage::GetColorZones { .. } => &[T::StateMultiZone, T::StateZone],
            RequestMessage::GetExtendedColorZones => &[T::StateExtendedColorZones],
            RequestMessage::GetDeviceChain => &[T::StateDeviceChain],
            RequestMessage::Get64 { .. } => &[T::State64],
            RequestMessage::SetPower { .. }
            | RequestMessage::SetLabel { .. }
            | RequestMessage::LightSetColor { .. }
            | RequestMessage::LightSetPower { .. }
            | RequestMessage::SetColorZones { .. }
            | RequestMessage::SetExtendedColorZones { .. }
            | RequestMessage::Set64 { .. } => &[T::Acknowledgement],
        }
    }

    /// Whether the request is confirmed by an acknowledgement rather than a state.
    pub fn is_setter(&self) -> bool {
        self.response_types() == [MessageType::Acknowledgement]
    }
}

impl ResponseMessage {
    pub fn is_acknowledgement(&self) -> bool {
        matches!(self, ResponseMessage::Acknowledgement)
    }
}

impl Message for RequestMessage {
    fn message_type(&self) -> MessageType {
        match self {
            RequestMessage::GetService => MessageType::GetService,
            RequestMessage::GetHostFirmware => MessageType::GetHostFirmware,
            RequestMessage::GetWifiInfo => MessageType::GetWifiInfo,
            RequestMessage::GetPower => MessageType::GetPower,
            RequestMessage::SetPower { .. } => MessageType::SetPower,
            RequestMessage::GetLabel => MessageType::GetLabel,
            RequestMessage::SetLabel { .. } => MessageType::SetLabel,
            RequestMessage::GetVersion => MessageType::GetVersion,
            RequestMessage::LightGet => MessageType::LightGet,
            RequestMessage::LightSetColor { .. } => MessageType::LightSetColor,
            RequestMessage::LightGetPower => MessageType::LightGetPower,
            RequestMessage::LightSetPower { .. } => MessageType::LightSetPower,
            RequestMessage::SetColorZones { .. } => MessageType::SetColorZones,
            RequestMessage::GetColorZones { .. } => MessageType::GetColorZones,
            RequestMessage::SetExtendedColorZones { .. } => MessageType::SetExtendedColorZones,
            RequestMessage::GetExtendedColorZones => MessageType::GetExtendedColorZones,
            RequestMessage::GetDeviceChain => MessageType::GetDeviceChain,
            RequestMessage::Get64 { .. } => MessageType::Get64,
            RequestMessage::Set64 { .. } => MessageType::Set64,
        }
    }

    fn write_payload(&self, v: &mut Vec<u8>) -> io::Result<()> {
        match self {
            RequestMessage::GetService
            | RequestMessage::GetHostFirmware
            | RequestMessage::GetWifiInfo
            | RequestMessage::GetPower
            | RequestMessage::GetLabel
            | RequestMessage::GetVersion
            | RequestMessage::LightGet
            | RequestMessage::LightGetPower
            | RequestMessage::GetExtendedColorZones
            | RequestMessage::GetDeviceChain => {}
            RequestMessage::SetPower { level } => {
                v.write_u16::<LittleEndian>(level.level())?;
            }
            RequestMessage::SetLabel { label } => write_label(v, label),
            RequestMessage::LightSetColor { color, duration } => {
                v.write_u8(0)?;
                write_color(v, color)?;
                v.write_u32::<LittleEndian>(*duration)?;
            }
            RequestMessage::LightSetPower { level, duration } => {
                v.write_u16::<LittleEndian>(level.level())?;
                v.write_u32::<LittleEndian>(*duration)?;
            }
            RequestMessage::SetColorZones {
                start,
                end,
                color,
                duration,
                apply,
            } => {
                v.write_u8(*start)?;
                v.write_u8(*end)?;
                write_color(v, color)?;
                v.write_u32::<LittleEndian>(*duration)?;
                v.write_u8(*apply as u8)?;
            }
            RequestMessage::GetColorZones { start, end } => {
                v.write_u8(*start)?;
                v.write_u8(*end)?;
            }
            RequestMessage::SetExtendedColorZones {
                duration,
                apply,
                index,
                colors,
            } => {
                let count = colors.len().min(EXTENDED_ZONES);
                v.write_u32::<LittleEndian>(*duration)?;
                v.write_u8(*apply as u8)?;
                v.write_u16::<LittleEndian>(*index)?;
                v.write_u8(count as u8)?;
                write_colors(v, colors, EXTENDED_ZONES)?;
            }
            RequestMessage::Get64 {
                tile_index,
                length,
                x,
                y,
                width,
            } => {
                v.write_u8(*tile_index)?;
                v.write_u8(*length)?;
                v.write_u8(0)?;
                v.write_u8(*x)?;
                v.write_u8(*y)?;
                v.write_u8(*width)?;
            }
            RequestMessage::Set64 {
                tile_index,
                length,
                x,
                y,
                width,
                duration,
                colors,
            } => {
                v.write_u8(*tile_index)?;
                v.write_u8(*length)?;
                v.write_u8(0)?;
                v.write_u8(*x)?;
                v.write_u8(*y)?;
                v.write_u8(*width)?;
                v.write_u32::<LittleEndian>(*duration)?;
                write_colors(v, colors, TILE_PIXELS)?;
            }
        }
        Ok(())
    }

    fn read_payload(message_type: MessageType, payload: &[u8]) -> Result<Self> {
        let mut r = PayloadReader::new(message_type, payload);
        let message = match message_type {
            MessageType::GetService => RequestMessage::GetService,
            MessageType::GetHostFirmware => RequestMessage::GetHostFirmware,
            MessageType::GetWifiInfo => RequestMessage::GetWifiInfo,
            MessageType::GetPower => RequestMessage::GetPower,
            MessageType::SetPower => RequestMessage::SetPower { level: r.power()? },
            MessageType::GetLabel => RequestMessage::GetLabel,
            MessageType::SetLabel => RequestMessage::SetLabel { label: r.label()? },
            MessageType::GetVersion => RequestMessage::GetVersion,
            MessageType::LightGet => RequestMessage::LightGet,
            MessageType::LightSetColor => {
                r.skip(1)?;
                RequestMessage::LightSetColor {
                    color: r.color()?,
                    duration: r.u32()?,
                }
            }
            MessageType::LightGetPower => RequestMessage::LightGetPower,
            MessageType::LightSetPower => RequestMessage::LightSetPower {
                level: r.power()?,
                duration: r.u32()?,
            },
            MessageType::SetColorZones => RequestMessage::SetColorZones {
                start: r.u8()?,
                end: r.u8()?,
                color: r.color()?,
                duration: r.u32()?,
                apply: r.apply()?,
            },
            MessageType::GetColorZones => RequestMessage::GetColorZones {
                start: r.u8()?,
                end: r.u8()?,
            },
            MessageType::SetExtendedColorZones => {
                let duration = r.u32()?;
                let apply = r.apply()?;
                let index = r.u16()?;
                let count = r.u8()? as usize;
                let mut colors = r.colors(EXTENDED_ZONES)?;
                colors.truncate(count);
                RequestMessage::SetExtendedColorZones {
                    duration,
                    apply,
                    index,
                    colors,
                }
            }
            MessageType::GetExtendedColorZones => RequestMessage::GetExtendedColorZones,
            MessageType::GetDeviceChain => RequestMessage::GetDeviceChain,
            MessageType::Get64 => {
                let tile_index = r.u8()?;
                let length = r.u8()?;
                r.skip(1)?;
                RequestMessage::Get64 {
                    tile_index,
                    length,
                    x: r.u8()?,
                    y: r.u8()?,
                    width: r.u8()?,
                }
            }
            MessageType::Set64 => {
                let tile_index = r.u8()?;
                let length = r.u8()?;
                r.skip(1)?;
                RequestMessage::Set64 {
                    tile_index,
                    length,
                    x: r.u8()?,
                    y: r.u8()?,
                    width: r.u8()?,
                    duration: r.u32()?,
                    colors: r.colors(TILE_PIXELS)?,
                }
            }
            other => {
                return Err(Error::malformed(format!("{other} is not a request")));
            }
        };
        Ok(message)
    }
}

impl Message for ResponseMessage {
    fn message_type(&self) -> MessageType {
        match self {
            ResponseMessage::StateService { .. } => MessageType::StateService,
            ResponseMessage::StateHostFirmware { .. } => MessageType::StateHostFirmware,
            ResponseMessage::StateWifiInfo { .. } => MessageType::StateWifiInfo,
            ResponseMessage::StatePower { .. } => MessageType::StatePower,
            ResponseMessage::StateLabel { .. } => MessageType::StateLabel,
            ResponseMessage::StateVersion { .. } => MessageType::StateVersion,
            ResponseMessage::Acknowledgement => MessageType::Acknowledgement,
            ResponseMessage::LightState { .. } => MessageType::LightState,
            ResponseMessage::LightStatePower { .. } => MessageType::LightStatePower,
            ResponseMessage::StateZone { .. } => MessageType::StateZone,
            ResponseMessage::StateMultiZone { .. } => MessageType::StateMultiZone,
            ResponseMessage::StateExtendedColorZones { .. } => MessageType::StateExtendedColorZones,
            ResponseMessage::StateDeviceChain { .. } => MessageType::StateDeviceChain,
            ResponseMessage::State64 { .. } => MessageType::State64,
        }
    }

    fn write_payload(&self, v: &mut Vec<u8>) -> io::Result<()> {
        match self {
            ResponseMessage::StateService { service, port } => {
                v.write_u8(*service)?;
                v.write_u32::<LittleEndian>(*port)?;
            }
            ResponseMessage::StateHostFirmware { build, version } => {
                v.write_u64::<LittleEndian>(*build)?;
                v.write_u64::<LittleEndian>(0)?;
                v.write_u16::<LittleEndian>(version.minor)?;
                v.write_u16::<LittleEndian>(version.major)?;
            }
            ResponseMessage::StateWifiInfo { signal, tx, rx } => {
                v.write_f32::<LittleEndian>(*signal)?;
                v.write_u32::<LittleEndian>(*tx)?;
                v.write_u32::<LittleEndian>(*rx)?;
                v.write_i16::<LittleEndian>(0)?;
            }
            ResponseMessage::StatePower { level } | ResponseMessage::LightStatePower { level } => {
                v.write_u16::<LittleEndian>(level.level())?;
            }
            ResponseMessage::StateLabel { label } => write_label(v, label),
            ResponseMessage::StateVersion {
                vendor,
                product,
                version,
            } => {
                v.write_u32::<LittleEndian>(*vendor)?;
                v.write_u32::<LittleEndian>(*product)?;
                v.write_u32::<LittleEndian>(*version)?;
            }
            ResponseMessage::Acknowledgement => {}
            ResponseMessage::LightState {
                color,
                power,
                label,
            } => {
                write_color(v, color)?;
                v.write_i16::<LittleEndian>(0)?;
                v.write_u16::<LittleEndian>(power.level())?;
                write_label(v, label);
                v.write_u64::<LittleEndian>(0)?;
            }
            ResponseMessage::StateZone {
                count,
                index,
                color,
            } => {
                v.write_u8(*count)?;
                v.write_u8(*index)?;
                write_color(v, color)?;
            }
            ResponseMessage::StateMultiZone {
                count,
                index,
                colors,
            } => {
                v.write_u8(*count)?;
                v.write_u8(*index)?;
                write_colors(v, colors, MULTIZONE_BATCH)?;
            }
            ResponseMessage::StateExtendedColorZones {
                count,
                index,
                colors,
            } => {
                v.write_u16::<LittleEndian>(*count)?;
                v.write_u16::<LittleEndian>(*index)?;
                v.write_u8(colors.len().min(EXTENDED_ZONES) as u8)?;
                write_colors(v, colors, EXTENDED_ZONES)?;
            }
            ResponseMessage::StateDeviceChain {
                start_index,
                tiles,
                total_count,
            } => {
                v.write_u8(*start_index)?;
                for slot in 0..CHAIN_TILES {
                    write_tile(v, tiles.get(slot))?;
                }
                v.write_u8(*total_count)?;
            }
            ResponseMessage::State64 {
                tile_index,
                x,
                y,
                width,
                colors,
            } => {
                v.write_u8(*tile_index)?;
                v.write_u8(0)?;
                v.write_u8(*x)?;
                v.write_u8(*y)?;
                v.write_u8(*width)?;
                write_colors(v, colors, TILE_PIXELS)?;
            }
        }
        Ok(())
    }

    fn read_payload(message_type: MessageType, payload: &[u8]) -> Result<Self> {
        let mut r = PayloadReader::new(message_type, payload);
        let message = match message_type {
            MessageType::StateService => ResponseMessage::StateService {
                service: r.u8()?,
                port: r.u32()?,
            },
            MessageType::StateHostFirmware => {
                let build = r.u64()?;
                r.skip(8)?;
                let minor = r.u16()?;
                let major = r.u16()?;
                ResponseMessage::StateHostFirmware {
                    build,
                    version: FirmwareVersion::new(major, minor),
                }
            }
            MessageType::StateWifiInfo => ResponseMessage::StateWifiInfo {
                signal: r.f32()?,
                tx: r.u32()?,
                rx: r.u32()?,
            },
            MessageType::StatePower => ResponseMessage::StatePower { level: r.power()? },
            MessageType::StateLabel => ResponseMessage::StateLabel { label: r.label()? },
            MessageType::StateVersion => ResponseMessage::StateVersion {
                vendor: r.u32()?,
                product: r.u32()?,
                version: r.u32()?,
            },
            MessageType::Acknowledgement => ResponseMessage::Acknowledgement,
            MessageType::LightState => {
                let color = r.color()?;
                r.skip(2)?;
                let power = r.power()?;
                let label = r.label()?;
                ResponseMessage::LightState {
                    color,
                    power,
                    label,
                }
            }
            MessageType::LightStatePower => ResponseMessage::LightStatePower { level: r.power()? },
            MessageType::StateZone => ResponseMessage::StateZone {
                count: r.u8()?,
                index: r.u8()?,
                color: r.color()?,
            },
            MessageType::StateMultiZone => ResponseMessage::StateMultiZone {
                count: r.u8()?,
                index: r.u8()?,
                colors: r.colors(MULTIZONE_BATCH)?,
            },
            MessageType::StateExtendedColorZones => {
                let count = r.u16()?;
                let index = r.u16()?;
                let colors_count = r.u8()? as usize;
                let mut colors = r.colors(EXTENDED_ZONES)?;
                colors.truncate(colors_count);
                ResponseMessage::StateExtendedColorZones {
                    count,
                    index,
                    colors,
                }
            }
            MessageType::StateDeviceChain => {
                let start_index = r.u8()?;
                let mut tiles = Vec::with_capacity(CHAIN_TILES);
                for _ in 0..CHAIN_TILES {
                    tiles.push(r.tile()?);
                }
                let total_count = r.u8()?;
                tiles.truncate(total_count.saturating_sub(start_index) as usize);
                ResponseMessage::StateDeviceChain {
                    start_index,
                    tiles,
                    total_count,
                }
            }
            MessageType::State64 => {
                let tile_index = r.u8()?;
                r.skip(1)?;
                ResponseMessage::State64 {
                    tile_index,
                    x: r.u8()?,
                    y: r.u8()?,
                    width: r.u8()?,
                    colors: r.colors(TILE_PIXELS)?,
                }
            }
            other => {
                return Err(Error::malformed(format!("{other} is not a response")));
            }
        };
        Ok(message)
    }
}

/// Little-endian payload reader that reports short reads as `MalformedPacket`.
struct PayloadReader<'a> {
    c: Cursor<&'a [u8]>,
    message_type: MessageType,
}

impl<'a> PayloadReader<'a> {
    fn new(message_type: MessageType, payload: &'a [u8]) -> Self {
        PayloadReader {
            c: Cursor::new(payload),
            message_type,
        }
    }

    fn check<T>(&self, result: io::Result<T>) -> Result<T> {
        result.map_err(|e| {
            Error::malformed(format!("truncated {} payload: {e}", self.message_type))
        })
    }

    fn u8(&mut self) -> Result<u8> {
        let v = self.c.read_u8();
        self.check(v)
    }

    fn u16(&mut self) -> Result<u16> {
        let v = self.c.read_u16::<LittleEndian>();
        self.check(v)
    }

    fn u32(&mut self) -> Result<u32> {
        let v = self.c.read_u32::<LittleEndian>();
        self.check(v)
    }

    fn u64(&mut self) -> Result<u64> {
        let v = self.c.read_u64::<LittleEndian>();
        self.check(v)
    }

    fn f32(&mut self) -> Result<f32> {
        let v = self.c.read_f32::<LittleEndian>();
        self.check(v)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let mut buf = vec![0u8; n];
        let v = self.c.read_exact(&mut buf);
        self.check(v)
    }

    fn power(&mut self) -> Result<Power> {
        self.u16().map(Power::from_level)
    }

    fn color(&mut self) -> Result<Color> {
        Ok(Color::new(self.u16()?, self.u16()?, self.u16()?, self.u16()?))
    }

    fn colors(&mut self, slots: usize) -> Result<Vec<Color>> {
        (0..slots).map(|_| self.color()).collect()
    }

    fn apply(&mut self) -> Result<ApplicationRequest> {
        let raw = self.u8()?;
        ApplicationRequest::from_repr(raw).ok_or_else(|| {
            Error::malformed(format!("invalid apply value {raw} in {}", self.message_type))
        })
    }

    fn label(&mut self) -> Result<String> {
        let mut raw = [0u8; LABEL_SIZE];
        let v = self.c.read_exact(&mut raw);
        self.check(v)?;
        let text = String::from_utf8_lossy(&raw);
        Ok(text.trim_end_matches('\0').to_string())
    }

    fn tile(&mut self) -> Result<TileInfo> {
        // accelerometer x/y/z and a reserved i16
        self.skip(8)?;
        let user_x = self.f32()?;
        let user_y = self.f32()?;
        let width = self.u8()?;
        let height = self.u8()?;
        // reserved, device version, firmware build/version, reserved
        self.skip(37)?;
        Ok(TileInfo {
            width,
            height,
            user_x,
            user_y,
        })
    }
}

fn write_color(v: &mut Vec<u8>, color: &Color) -> io::Result<()> {
    v.write_u16::<LittleEndian>(color.hue)?;
    v.write_u16::<LittleEndian>(color.saturation)?;
    v.write_u16::<LittleEndian>(color.brightness)?;
    v.write_u16::<LittleEndian>(color.kelvin)
}

/// Write exactly `slots` colors, padding with [`Color::NONE`] or truncating.
fn write_colors(v: &mut Vec<u8>, colors: &[Color], slots: usize) -> io::Result<()> {
    for slot in 0..slots {
        write_color(v, colors.get(slot).unwrap_or(&Color::NONE))?;
    }
    Ok(())
}

/// Write a label into the fixed field, cut on a char boundary and NUL padded.
fn write_label(v: &mut Vec<u8>, label: &str) {
    let mut end = label.len().min(LABEL_SIZE);
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    v.extend_from_slice(&label.as_bytes()[..end]);
    v.resize(v.len() + LABEL_SIZE - end, 0);
}

fn write_tile(v: &mut Vec<u8>, tile: Option<&TileInfo>) -> io::Result<()> {
    // accelerometer x/y/z and a reserved i16
    v.extend_from_slice(&[0; 8]);
    v.write_f32::<LittleEndian>(tile.map_or(0.0, |t| t.user_x))?;
    v.write_f32::<LittleEndian>(tile.map_or(0.0, |t| t.user_y))?;
    v.write_u8(tile.map_or(0, |t| t.width))?;
    v.write_u8(tile.map_or(0, |t| t.height))?;
    // reserved, device version, firmware build/version, reserved
    v.extend_from_slice(&[0; 37]);
    Ok(())
}
