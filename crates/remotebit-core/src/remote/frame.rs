//! remote:bit component frames
//!
//! Every packet on the byte channel starts with a component code and a component id. What
//! follows is either a list of 16-bit little-endian values or raw bytes:
//!
//! ```text
//! +-----------+----+---------------------------------+
//! | component | id | payload (u16 LE values or raw)  |
//! +-----------+----+---------------------------------+
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::FrameError;

/// Highest component id a frame may carry
pub const MAX_COMPONENT_ID: u8 = 15;

// ----------------------------------------------------------------------------
// Components
// ----------------------------------------------------------------------------

/// Components the device reports to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SendComponent {
    Speed = 100,
    Distance = 101,
}

/// Components the peer reports to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReceivedComponent {
    Button = 100,
    Joystick = 101,
}

impl TryFrom<u8> for ReceivedComponent {
    type Error = FrameError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            100 => Ok(ReceivedComponent::Button),
            101 => Ok(ReceivedComponent::Joystick),
            code => Err(FrameError::UnknownComponent { code }),
        }
    }
}

/// Instance number of a component, 0 to 15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u8);

impl ComponentId {
    pub fn new(id: u8) -> Option<Self> {
        (id <= MAX_COMPONENT_ID).then_some(Self(id))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ComponentId {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(FrameError::InvalidComponentId { id })
    }
}

// ----------------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------------

/// Encode `values` as a frame for `component`
pub fn encode_values(component: SendComponent, id: ComponentId, values: &[u16]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + values.len() * 2);
    frame.push(component as u8);
    frame.push(id.value());
    for value in values {
        frame.extend_from_slice(&value.to_le_bytes());
    }
    frame
}

/// Encode raw `bytes` as a frame for `component`
pub fn encode_buffer(component: SendComponent, id: ComponentId, bytes: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + bytes.len());
    frame.push(component as u8);
    frame.push(id.value());
    frame.extend_from_slice(bytes);
    frame
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

/// A frame received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame<'a> {
    pub component: ReceivedComponent,
    pub id: ComponentId,
    pub payload: &'a [u8],
}

impl<'a> InboundFrame<'a> {
    pub fn decode(raw: &'a [u8]) -> Result<Self, FrameError> {
        if raw.len() < 2 {
            return Err(FrameError::TooShort { len: raw.len() });
        }

        Ok(Self {
            component: ReceivedComponent::try_from(raw[0])?,
            id: ComponentId::try_from(raw[1])?,
            payload: &raw[2..],
        })
    }

    /// Payload read as little-endian u16 values
    ///
    /// A trailing odd byte becomes a value whose high octet is zero.
    pub fn values(&self) -> Vec<u16> {
        self.payload
            .chunks(2)
            .map(|pair| match *pair {
                [low, high] => u16::from_le_bytes([low, high]),
                [low] => u16::from(low),
                _ => 0,
            })
            .collect()
    }
}
