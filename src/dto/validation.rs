//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest team name the scoreboard can render without truncation.
pub const MAX_TEAM_NAME_LENGTH: usize = 40;

/// Validates that a team name has visible content and fits the scoreboard.
///
/// Names are compared and stored as typed (minus surrounding whitespace), so
/// a blank or whitespace-only entry is rejected here rather than producing an
/// unnamed team later.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_TEAM_NAME_LENGTH {
        let mut err = ValidationError::new("team_name_length");
        err.message = Some(
            format!("Team name must be at most {MAX_TEAM_NAME_LENGTH} characters").into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_valid() {
        assert!(validate_team_name("Rojos").is_ok());
        assert!(validate_team_name("  Los Tigres  ").is_ok());
        assert!(validate_team_name("Peña 5").is_ok());
    }

    #[test]
    fn test_validate_team_name_blank() {
        assert!(validate_team_name("").is_err());
        assert!(validate_team_name("   ").is_err());
        assert!(validate_team_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_team_name_too_long() {
        let long = "x".repeat(MAX_TEAM_NAME_LENGTH + 1);
        assert!(validate_team_name(&long).is_err());
        let exact = "x".repeat(MAX_TEAM_NAME_LENGTH);
        assert!(validate_team_name(&exact).is_ok());
    }
}
