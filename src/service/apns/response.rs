use bytes::Buf;

use crate::service::ResponseOutcome;

/// Length of an APNS error-response packet.
pub(crate) const ERROR_RESPONSE_LENGTH: usize = 6;

/// Command byte of an APNS error-response packet.
const ERROR_RESPONSE_COMMAND: u8 = 8;

fn status_description(status: u8) -> &'static str {
    match status {
        0 => "No errors encountered",
        1 => "Processing error",
        2 => "Missing device token",
        3 => "Missing topic",
        4 => "Missing payload",
        5 => "Invalid token size",
        6 => "Invalid topic size",
        7 => "Invalid payload size",
        8 => "Invalid token",
        10 => "Shutdown",
        _ => "None (unknown)",
    }
}

/// Decode the gateway's reply to a frame. Silence means the frame was accepted.
pub(crate) fn parse_error_packet(packet: Option<&[u8]>) -> ResponseOutcome {
    let mut packet = match packet {
        None | Some([]) => return ResponseOutcome::Success,
        Some(packet) => packet,
    };

    if packet.len() < ERROR_RESPONSE_LENGTH {
        return ResponseOutcome::ProtocolViolation {
            description: format!(
                "Unable to unpack response data: expected {} bytes, got {}",
                ERROR_RESPONSE_LENGTH,
                packet.len()
            ),
        };
    }

    let command = packet.get_u8();
    let status = packet.get_u8();
    let identifier = packet.get_u32();

    if command != ERROR_RESPONSE_COMMAND {
        return ResponseOutcome::ProtocolViolation {
            description: format!("Invalid APNS response packet command {}", command),
        };
    }

    ResponseOutcome::DispatchError {
        code: u16::from(status),
        description: format!(
            "{} (notification {})",
            status_description(status),
            identifier
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_success() {
        assert!(parse_error_packet(None).is_success());
        assert!(parse_error_packet(Some(&[])).is_success());
    }

    #[test]
    fn test_error_packet_maps_status() {
        let packet = [8u8, 8, 0, 0, 0, 42];
        match parse_error_packet(Some(&packet)) {
            ResponseOutcome::DispatchError { code, description } => {
                assert_eq!(code, 8);
                assert!(description.starts_with("Invalid token"));
                assert!(description.contains("42"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status() {
        let packet = [8u8, 255, 0, 0, 0, 1];
        assert_eq!(
            parse_error_packet(Some(&packet)).error_code(),
            Some(255)
        );
        let packet = [8u8, 99, 0, 0, 0, 1];
        match parse_error_packet(Some(&packet)) {
            ResponseOutcome::DispatchError { description, .. } => {
                assert!(description.starts_with("None (unknown)"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_wrong_command_or_short_packet() {
        assert!(matches!(
            parse_error_packet(Some(&[1, 8, 0, 0, 0, 1])),
            ResponseOutcome::ProtocolViolation { .. }
        ));
        assert!(matches!(
            parse_error_packet(Some(&[8, 8])),
            ResponseOutcome::ProtocolViolation { .. }
        ));
    }
}
