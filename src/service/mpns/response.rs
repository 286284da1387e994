use crate::message::RecipientDevice;
use crate::service::ResponseOutcome;

fn dispatch_error(code: u16, description: &str) -> ResponseOutcome {
    ResponseOutcome::DispatchError {
        code,
        description: description.to_string(),
    }
}

pub(crate) fn parse_response(status: u16, mut recipients: Vec<RecipientDevice>) -> ResponseOutcome {
    match status {
        200 => ResponseOutcome::Success,
        400 => ResponseOutcome::Malformed {
            code: status,
            description: "Notification request with a bad XML document or malformed notification URI"
                .into(),
        },
        401 => dispatch_error(status, "Sending this notification is unauthorized"),
        404 => {
            if let Some(recipient) = recipients.first_mut() {
                recipient.mark_not_registered();
            }
            ResponseOutcome::InvalidRecipients { recipients }
        }
        405 => dispatch_error(
            status,
            "Invalid method. Only POST is allowed when sending a notification request",
        ),
        406 => dispatch_error(
            status,
            "Unauthenticated service has reached the per-day throttling limit",
        ),
        412 => dispatch_error(status, "The device is in a disconnected state"),
        503 => dispatch_error(
            status,
            "The Push Notification Service is unable to process the request",
        ),
        other => ResponseOutcome::ProtocolViolation {
            description: format!("Unknown error occurred while sending notification (HTTP {})", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::IdentifierStatus;
    use crate::provider::Provider;

    fn channel() -> Vec<RecipientDevice> {
        vec![RecipientDevice::new(Provider::Mpns, "dGVzdA==").unwrap()]
    }

    #[test]
    fn test_status_mapping() {
        assert!(parse_response(200, channel()).is_success());
        assert!(matches!(
            parse_response(400, channel()),
            ResponseOutcome::Malformed { code: 400, .. }
        ));
        for code in [401, 405, 406, 412, 503] {
            assert_eq!(parse_response(code, channel()).error_code(), Some(code));
        }
        assert!(matches!(
            parse_response(500, channel()),
            ResponseOutcome::ProtocolViolation { .. }
        ));
    }

    #[test]
    fn test_not_found_flags_recipient() {
        let outcome = parse_response(404, channel());
        let flagged: Vec<&RecipientDevice> = outcome.flagged_recipients().collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].status(), IdentifierStatus::NotRegistered);
    }
}
