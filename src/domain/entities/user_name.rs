use crate::helper::error_chain_fmt;

const MAX_USERNAME_LENGTH: usize = 64;
const MIN_USERNAME_LENGTH: usize = 3;

/// A validated username
///
/// Usernames are the public identity on shared brain pages, so the accepted
/// alphabet is kept narrow: ASCII letters, digits, `_`, `-` and `.`.
#[derive(Debug, Clone)]
pub struct UserName(String);

impl UserName {
    pub fn parse(s: &str) -> Result<UserName, UserNameError> {
        let trimmed = s.trim();

        if trimmed.len() < MIN_USERNAME_LENGTH || trimmed.len() > MAX_USERNAME_LENGTH {
            return Err(UserNameError::InvalidUserName(format!(
                "A username must be between {} and {} characters, got {}",
                MIN_USERNAME_LENGTH,
                MAX_USERNAME_LENGTH,
                trimmed.len()
            )));
        }

        let is_valid_char =
            |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.';
        if !trimmed.chars().all(is_valid_char) {
            return Err(UserNameError::InvalidUserName(format!(
                "{} contains characters outside of [a-zA-Z0-9_-.]",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum UserNameError {
    #[error("Invalid username: {0}")]
    InvalidUserName(String),
}

impl std::fmt::Debug for UserNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::UserName;
    use claims::{assert_err, assert_ok};
    use quickcheck::Gen;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone)]
    struct ValidUserNameFixture(pub String);

    // Randomly generates a valid username
    impl quickcheck::Arbitrary for ValidUserNameFixture {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut rng = StdRng::seed_from_u64(u64::arbitrary(g));
            let alphabet: Vec<char> =
                ('a'..='z').chain('0'..='9').chain(['_', '-', '.']).collect();

            let length = rng.gen_range(3..=64);
            let username = (0..length)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            Self(username)
        }
    }

    #[quickcheck_macros::quickcheck]
    fn valid_usernames_are_parsed_successfully(valid_username: ValidUserNameFixture) -> bool {
        UserName::parse(&valid_username.0).is_ok()
    }

    #[test]
    fn a_plain_alphanumeric_name_is_accepted() {
        assert_ok!(UserName::parse("ursula_42"));
        assert_ok!(UserName::parse("jane.doe"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let name = UserName::parse("  ursula  ").unwrap();
        assert_eq!(name.as_ref(), "ursula");
    }

    #[test]
    fn an_empty_name_is_rejected() {
        assert_err!(UserName::parse(""));
        assert_err!(UserName::parse("   "));
    }

    #[test]
    fn a_too_short_or_too_long_name_is_rejected() {
        assert_err!(UserName::parse("ab"));
        assert_err!(UserName::parse(&"a".repeat(65)));
    }

    #[test]
    fn names_with_forbidden_characters_are_rejected() {
        for name in ["with space", "slash/name", "quote\"name", "semi;colon"] {
            assert_err!(UserName::parse(name));
        }
    }
}
