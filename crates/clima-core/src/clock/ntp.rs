//! SNTP (RFC 4330) client packet encoding and response parsing
//!
//! Only the packet format lives here; the UDP exchange is performed by the
//! platform network stack.

use thiserror_no_std::Error;

pub const NTP_PORT: u16 = 123;

pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Seconds in one NTP era (32-bit seconds counter)
const NTP_ERA_SECS: u64 = 1 << 32;

/// LI = 0 (no warning), VN = 3, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0b00_011_011;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;

const TRANSMIT_TIMESTAMP: usize = 40;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpError {
    #[error("NTP response too short ({0} bytes)")]
    TooShort(usize),
    #[error("unexpected NTP mode {0}")]
    UnexpectedMode(u8),
    #[error("NTP server sent kiss-of-death")]
    KissOfDeath,
    #[error("NTP server is unsynchronized")]
    Unsynchronized,
}

/// Build a client request packet.
pub fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Extract the server transmit time as Unix seconds.
pub fn parse_response(packet: &[u8]) -> Result<u64, NtpError> {
    if packet.len() < PACKET_LEN {
        return Err(NtpError::TooShort(packet.len()));
    }

    let mode = packet[0] & 0x07;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(NtpError::UnexpectedMode(mode));
    }

    // Stratum 0 carries a kiss code instead of a time
    if packet[1] == 0 {
        return Err(NtpError::KissOfDeath);
    }

    let secs = u64::from(u32::from_be_bytes([
        packet[TRANSMIT_TIMESTAMP],
        packet[TRANSMIT_TIMESTAMP + 1],
        packet[TRANSMIT_TIMESTAMP + 2],
        packet[TRANSMIT_TIMESTAMP + 3],
    ]));
    if secs == 0 {
        return Err(NtpError::Unsynchronized);
    }

    // Era 1 starts in February 2036; anything below the offset must be in it.
    if secs >= NTP_UNIX_OFFSET {
        Ok(secs - NTP_UNIX_OFFSET)
    } else {
        Ok(secs + NTP_ERA_SECS - NTP_UNIX_OFFSET)
    }
}
