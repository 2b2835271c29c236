//! Skill file parsing: YAML frontmatter between `---` fences, then the body.

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing frontmatter (expected a leading '---' block)")]
    MissingFrontmatter,

    #[error("unterminated frontmatter block")]
    UnterminatedFrontmatter,

    #[error("invalid frontmatter: {0}")]
    InvalidFrontmatter(#[from] serde_yaml::Error),

    #[error("skill name is empty")]
    EmptyName,
}

#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// The long-form instructions.
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    name: String,
    #[serde(default)]
    description: String,
}

/// Parse one skill document.
pub fn parse_skill(raw: &str) -> Result<Skill, ParseError> {
    let rest = raw.strip_prefix("---").ok_or(ParseError::MissingFrontmatter)?;
    let (header, body) = rest.split_once("\n---").ok_or(ParseError::UnterminatedFrontmatter)?;

    let frontmatter: Frontmatter = serde_yaml::from_str(header)?;
    if frontmatter.name.trim().is_empty() {
        return Err(ParseError::EmptyName);
    }

    // Drop the rest of the closing fence line.
    let body = body.split_once('\n').map(|(_, b)| b).unwrap_or("");

    Ok(Skill {
        name: frontmatter.name.trim().to_string(),
        description: frontmatter.description.trim().to_string(),
        body: body.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let skill = parse_skill(
            "---\nname: refund_policy\ndescription: How to process refunds\n---\n\nAlways check the order first.\n",
        )
        .unwrap();

        assert_eq!(skill.name, "refund_policy");
        assert_eq!(skill.description, "How to process refunds");
        assert_eq!(skill.body, "Always check the order first.");
    }

    #[test]
    fn test_missing_frontmatter() {
        assert!(matches!(parse_skill("no fences here"), Err(ParseError::MissingFrontmatter)));
    }

    #[test]
    fn test_unterminated_frontmatter() {
        assert!(matches!(
            parse_skill("---\nname: x\ndescription: y\n"),
            Err(ParseError::UnterminatedFrontmatter)
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            parse_skill("---\nname: \"\"\n---\nbody"),
            Err(ParseError::EmptyName)
        ));
    }
}
