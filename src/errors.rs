use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, status, Responder};
use rocket::serde::json::{json, Json};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Field errors rendered as `{"errors": {"field": ["message", ...]}}` with
/// status 422, the shape API clients expect.
#[derive(Debug)]
pub struct Errors {
    errors: ValidationErrors,
}

impl Errors {
    pub fn new(errs: &[(&'static str, &'static str)]) -> Self {
        let mut errors = ValidationErrors::new();
        for &(field, message) in errs {
            errors.add(field, ValidationError::new(message));
        }
        Errors { errors }
    }
}

impl<'r> Responder<'r, 'static> for Errors {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let mut errors = json!({});
        for (field, kind) in self.errors.into_errors() {
            if let ValidationErrorsKind::Field(field_errors) = kind {
                errors[field] = field_errors
                    .into_iter()
                    .map(|err| err.code.into_owned())
                    .collect::<Vec<String>>()
                    .into();
            }
        }
        status::Custom(Status::UnprocessableEntity, Json(json!({ "errors": errors })))
            .respond_to(req)
    }
}

/// Accumulates `validator` results plus required-field checks before a
/// handler touches the store.
pub struct FieldValidator {
    errors: ValidationErrors,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }
}

impl FieldValidator {
    pub fn validate<T: Validate>(model: &T) -> Self {
        Self {
            errors: model.validate().err().unwrap_or_else(ValidationErrors::new),
        }
    }

    /// Pulls a required field out of a deserialized payload, recording an
    /// error when it is absent.
    pub fn extract<T>(&mut self, field_name: &'static str, field: Option<T>) -> T
    where
        T: Default,
    {
        field.unwrap_or_else(|| {
            self.errors
                .add(field_name, ValidationError::new("can't be blank"));
            T::default()
        })
    }

    pub fn check(self) -> Result<(), Errors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Errors {
                errors: self.errors,
            })
        }
    }
}

/// Maps a unique-constraint violation onto the offending field; anything
/// else becomes an opaque database error.
pub fn constraint_errors(err: DieselError) -> Errors {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) = err {
        const FIELDS: &[&str] = &["username", "email", "slug"];
        for &field in FIELDS {
            if info.message().contains(field) {
                return Errors::new(&[(field, "has already been taken")]);
            }
        }
    }
    Errors::new(&[("database", "unexpected error")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_records_missing_fields() {
        let mut validator = FieldValidator::default();
        let value: String = validator.extract("title", None);
        assert_eq!(value, "");
        assert!(validator.check().is_err());
    }

    #[test]
    fn extract_passes_present_fields() {
        let mut validator = FieldValidator::default();
        let value = validator.extract("title", Some("hello".to_string()));
        assert_eq!(value, "hello");
        assert!(validator.check().is_ok());
    }
}
