//! Registration form validation.
//!
//! Turns the raw form into [`RegistrationData`], collecting every field error
//! rather than stopping at the first.

use checkout_core::error::{FieldError, ValidationErrors};
use checkout_core::types::{RegistrationData, or_not_applicable};
use serde::{Deserialize, Serialize};

/// Registration form exactly as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Contact number
    pub contact_no: String,
    /// College/university id (optional)
    #[serde(default)]
    pub uni_id: String,
    /// College/university name (optional)
    #[serde(default)]
    pub uni_name: String,
    /// Where the attendee resides
    pub where_you_reside: String,
}

impl RegistrationForm {
    /// Validate and normalize the form
    ///
    /// Required fields are trimmed; blank university fields become `"N/A"`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every rejected field.
    pub fn validate(&self) -> Result<RegistrationData, ValidationErrors> {
        let mut errors = Vec::new();

        let name = required(&mut errors, "name", &self.name, "Name is required");
        let email = required(&mut errors, "email", &self.email, "Email is required");
        let contact_no = required(
            &mut errors,
            "contact_no",
            &self.contact_no,
            "Contact number is required",
        );
        let where_you_reside = required(
            &mut errors,
            "where_you_reside",
            &self.where_you_reside,
            "Please tell us where you reside",
        );

        if !email.is_empty() && !is_valid_email(&email) {
            errors.push(FieldError {
                field: "email",
                message: "Invalid email address".to_string(),
            });
        }
        if !contact_no.is_empty() && !is_valid_contact_no(&contact_no) {
            errors.push(FieldError {
                field: "contact_no",
                message: "Invalid contact number".to_string(),
            });
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(RegistrationData {
            name,
            email,
            contact_no,
            uni_id: or_not_applicable(&self.uni_id),
            uni_name: or_not_applicable(&self.uni_name),
            where_you_reside,
        })
    }
}

fn required(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    message: &str,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }
    trimmed.to_string()
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn is_valid_contact_no(contact_no: &str) -> bool {
    let digits = contact_no.strip_prefix('+').unwrap_or(contact_no);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use checkout_testing::properties::{
        blank_text, invalid_email, non_blank_text, valid_contact_no, valid_email,
    };
    use proptest::prelude::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            contact_no: "123".to_string(),
            uni_id: String::new(),
            uni_name: String::new(),
            where_you_reside: "X".to_string(),
        }
    }

    #[test]
    fn blank_university_fields_become_not_applicable() {
        let data = form().validate().unwrap();
        assert_eq!(data.uni_id, "N/A");
        assert_eq!(data.uni_name, "N/A");
        assert_eq!(data.name, "A");
    }

    #[test]
    fn filled_university_fields_are_kept() {
        let data = RegistrationForm {
            uni_id: "CS-2041".to_string(),
            uni_name: "Jadavpur University".to_string(),
            ..form()
        }
        .validate()
        .unwrap();
        assert_eq!(data.uni_id, "CS-2041");
        assert_eq!(data.uni_name, "Jadavpur University");
    }

    #[test]
    fn every_missing_field_is_reported() {
        let errors = RegistrationForm::default().validate().unwrap_err();
        for field in ["name", "email", "contact_no", "where_you_reside"] {
            assert!(errors.has_field(field), "{field} not reported");
        }
        assert_eq!(errors.0.len(), 4);
        assert_eq!(errors.first_message(), Some("Name is required"));
    }

    #[test]
    fn malformed_contact_numbers_are_rejected() {
        for contact_no in ["abc", "+", "12a4", "--"] {
            let errors = RegistrationForm {
                contact_no: contact_no.to_string(),
                ..form()
            }
            .validate()
            .unwrap_err();
            assert!(errors.has_field("contact_no"), "{contact_no} accepted");
        }
    }

    #[test]
    fn formatted_contact_numbers_are_accepted() {
        for contact_no in ["+91 98765 43210", "033-2414-6666", "123"] {
            assert!(
                RegistrationForm {
                    contact_no: contact_no.to_string(),
                    ..form()
                }
                .validate()
                .is_ok(),
                "{contact_no} rejected"
            );
        }
    }

    #[test]
    fn required_fields_are_trimmed() {
        let data = RegistrationForm {
            name: "  Asha Roy ".to_string(),
            ..form()
        }
        .validate()
        .unwrap();
        assert_eq!(data.name, "Asha Roy");
    }

    proptest! {
        #[test]
        fn blank_optional_fields_always_normalize(
            name in non_blank_text(),
            email in valid_email(),
            contact_no in valid_contact_no(),
            uni_id in blank_text(),
            uni_name in blank_text(),
        ) {
            let data = RegistrationForm {
                name,
                email,
                contact_no,
                uni_id,
                uni_name,
                where_you_reside: "Kolkata".to_string(),
            }
            .validate()
            .unwrap();
            prop_assert_eq!(data.uni_id, "N/A");
            prop_assert_eq!(data.uni_name, "N/A");
        }

        #[test]
        fn invalid_emails_are_rejected(email in invalid_email()) {
            let errors = RegistrationForm { email, ..form() }.validate().unwrap_err();
            prop_assert!(errors.has_field("email"));
        }
    }
}
