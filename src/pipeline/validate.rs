//! Eligibility check before any model call.

use crate::error::ValidationError;
use crate::pipeline::types::{Email, ValidEmail};

/// Accept an email only if both body and subject are present and non-blank.
///
/// Body is checked first so an email missing both reports the body.
pub fn validate(email: &Email) -> Result<ValidEmail, ValidationError> {
    let body = non_blank(email.body.as_deref()).ok_or_else(|| ValidationError::MissingBody {
        email_id: email.id.clone(),
    })?;
    let subject =
        non_blank(email.subject.as_deref()).ok_or_else(|| ValidationError::MissingSubject {
            email_id: email.id.clone(),
        })?;

    Ok(ValidEmail {
        id: email.id.clone(),
        recipient: email.recipient().to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: Option<&str>, body: Option<&str>) -> Email {
        Email {
            id: "test002".into(),
            from: Some("user@example.com".into()),
            subject: subject.map(String::from),
            body: body.map(String::from),
            timestamp: None,
        }
    }

    #[test]
    fn accepts_complete_email() {
        let valid = validate(&email(Some("Hello"), Some("Body text"))).unwrap();
        assert_eq!(valid.subject, "Hello");
        assert_eq!(valid.body, "Body text");
        assert_eq!(valid.recipient, "user@example.com");
    }

    #[test]
    fn missing_body_is_rejected() {
        let err = validate(&email(Some("No body"), None)).unwrap_err();
        assert!(err.to_string().contains("missing or empty 'body'"));
    }

    #[test]
    fn blank_body_is_treated_as_missing() {
        let err = validate(&email(Some("Subject"), Some("   \n\t"))).unwrap_err();
        assert!(matches!(err, ValidationError::MissingBody { .. }));
    }

    #[test]
    fn blank_subject_is_rejected() {
        let err = validate(&email(Some("  "), Some("body"))).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSubject { .. }));
    }

    #[test]
    fn body_reported_before_subject() {
        let err = validate(&email(None, None)).unwrap_err();
        assert!(matches!(err, ValidationError::MissingBody { .. }));
    }
}
