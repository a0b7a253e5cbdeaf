//! Wire protocol to the onboard microcontroller: a fixed 14-byte little-endian packet,
//! COBS-framed and written over a dedicated serial line.
//!
//! The packet format and field order mirror the original tracker's `struct.pack("<HhHhHhH",
//! ...)`; the per-primitive encoding style (`byteorder::WriteBytesExt`, one `write_*`
//! call per field) follows `bifrost::serialization::codec`'s `Encode` impls.

use std::io::Write;
use std::time::Duration;

use byteorder::{LittleEndian, WriteBytesExt};
use thiserror::Error;

/// Size of the encoded payload before COBS framing.
pub const PACKET_LEN: usize = 14;

/// Default device path for the microcontroller link.
pub const DEFAULT_DEVICE: &str = "/dev/ttyS0";

/// Default baud rate for the microcontroller link.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Upper bound on the encoded distance field, in hundredths of a centimetre (400.00 cm).
const DISTANCE_CLAMP_HUNDREDTHS: u32 = 40_000;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open serial device {device}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to write packet")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One tracked object's bearing (degrees) and distance (centimetres), or `None` when
/// nothing was detected this tick.
pub type Detection = Option<(f32, f32)>;

/// The ball/blue-goal/yellow-goal triple sent to the microcontroller once per tick.
///
/// Presence is tracked as an explicit [`Option`], never inferred from "is the bearing
/// zero" — a real detection at bearing exactly 0° still transmits correctly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Packet {
    pub ball: Detection,
    pub blue_goal: Detection,
    pub yellow_goal: Detection,
}

impl Packet {
    #[must_use]
    pub fn new(ball: Detection, blue_goal: Detection, yellow_goal: Detection) -> Self {
        Self { ball, blue_goal, yellow_goal }
    }

    /// Encodes the fixed 14-byte little-endian payload, before COBS framing.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = Vec::with_capacity(PACKET_LEN);
        buf.write_u16::<LittleEndian>(1).expect("write to Vec never fails");
        Self::write_detection(&mut buf, self.ball);
        Self::write_detection(&mut buf, self.blue_goal);
        Self::write_detection(&mut buf, self.yellow_goal);

        buf.try_into().expect("exactly PACKET_LEN bytes were written above")
    }

    fn write_detection(buf: &mut Vec<u8>, detection: Detection) {
        let Some((bearing, distance)) = detection else {
            buf.write_i16::<LittleEndian>(i16::MAX).expect("write to Vec never fails");
            buf.write_u16::<LittleEndian>(u16::MAX).expect("write to Vec never fails");
            return;
        };

        let bearing_hundredths = (bearing * 100.0).round() as i16;
        let distance_hundredths = (distance * 100.0).round().max(0.0) as u32;
        let distance_hundredths = distance_hundredths.min(DISTANCE_CLAMP_HUNDREDTHS) as u16;

        buf.write_i16::<LittleEndian>(bearing_hundredths).expect("write to Vec never fails");
        buf.write_u16::<LittleEndian>(distance_hundredths).expect("write to Vec never fails");
    }

    /// COBS-frames the payload and appends the trailing `0x00` delimiter the
    /// microcontroller uses to find frame boundaries.
    #[must_use]
    pub fn frame(&self) -> Vec<u8> {
        let payload = self.encode();
        let mut framed = cobs::encode_vec(&payload);
        framed.push(0);
        framed
    }
}

/// A serial link to the microcontroller, exclusively owned by `PacketSink`.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    /// Opens the default device (`/dev/ttyS0`, 1,000,000 baud, 8N1).
    pub fn open() -> Result<Self> {
        Self::open_with(DEFAULT_DEVICE, DEFAULT_BAUD_RATE)
    }

    pub fn open_with(device: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(device, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|source| Error::Open { device: device.to_string(), source })?;

        Ok(Self { port })
    }

    /// Writes one framed packet. Transient write failures are the caller's to log and
    /// discard — per spec, the next packet is the recovery strategy, there is no retry
    /// at this layer.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.port.write_all(&packet.frame())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABSENT_SENTINEL: [u8; 4] = [0xFF, 0x7F, 0xFF, 0xFF];

    #[test]
    fn all_absent_produces_sentinel_pairs() {
        let packet = Packet::new(None, None, None);
        let encoded = packet.encode();

        assert_eq!(&encoded[0..2], &[0x01, 0x00], "new_data flag");
        assert_eq!(&encoded[2..6], &ABSENT_SENTINEL);
        assert_eq!(&encoded[6..10], &ABSENT_SENTINEL);
        assert_eq!(&encoded[10..14], &ABSENT_SENTINEL);
    }

    #[test]
    fn concrete_scenario_vector() {
        // ball=(15.00, 123.45), blue=absent, yellow=(-90.00, 400.00).
        let packet = Packet::new(Some((15.00, 123.45)), None, Some((-90.00, 400.00)));
        let encoded = packet.encode();

        // Derived directly from the documented encoding rule: round(value * 100), LE,
        // sentinel i16::MAX/u16::MAX for absence.
        let expected: [u8; PACKET_LEN] = [
            0x01, 0x00, // new_data
            0xDC, 0x05, // ball bearing: 1500 = 15.00 * 100
            0x39, 0x30, // ball distance: 12345 = 123.45 * 100
            0xFF, 0x7F, 0xFF, 0xFF, // blue goal absent
            0xD8, 0xDC, // yellow bearing: -9000 (two's complement) = -90.00 * 100
            0x40, 0x9C, // yellow distance: 40000 = 400.00 * 100
        ];

        assert_eq!(encoded, expected);
    }

    #[test]
    fn distance_clamps_to_400cm() {
        let packet = Packet::new(Some((0.0, 500.00)), None, None);
        let encoded = packet.encode();
        assert_eq!(&encoded[2..6], &[0x00, 0x00, 0x40, 0x9C], "clamped to 40000 hundredths");
    }

    #[test]
    fn a_zero_bearing_detection_is_not_dropped() {
        let packet = Packet::new(Some((0.0, 50.0)), None, None);
        let encoded = packet.encode();
        assert_eq!(&encoded[2..4], &[0x00, 0x00], "bearing 0 is a real measurement");
        assert_ne!(&encoded[2..6], &ABSENT_SENTINEL);
    }

    #[test]
    fn framing_round_trips_through_cobs() {
        let packet = Packet::new(Some((15.0, 123.45)), None, Some((-90.0, 400.0)));
        let framed = packet.frame();

        assert_eq!(*framed.last().unwrap(), 0, "trailing delimiter");

        let encoded_without_delimiter = &framed[..framed.len() - 1];
        let decoded = cobs::decode_vec(encoded_without_delimiter).expect("valid COBS frame");
        assert_eq!(decoded, packet.encode());
    }
}
