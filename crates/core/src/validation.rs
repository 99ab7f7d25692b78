//! Bridge from `validator` derive checks to [`CoreError`].

use validator::Validate;

use crate::error::CoreError;

/// Run `validator` rules on a request DTO, mapping failures to
/// [`CoreError::Validation`].
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(errors.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1))]
        name: String,
        #[validate(range(min = 1))]
        amount: i64,
    }

    #[test]
    fn valid_input_passes() {
        let input = Sample {
            name: "ok".into(),
            amount: 1,
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn invalid_input_names_the_field() {
        let input = Sample {
            name: String::new(),
            amount: 0,
        };
        assert_matches!(
            validate_input(&input),
            Err(CoreError::Validation(msg)) if msg.contains("name") && msg.contains("amount")
        );
    }
}
