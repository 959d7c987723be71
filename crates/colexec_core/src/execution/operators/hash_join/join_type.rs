use std::fmt;

/// Join variants supported by the hash join.
///
/// The build side is always the left input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Standard INNER join.
    Inner,
    /// Standard LEFT join, unmatched build rows are emitted after probing.
    Left,
    /// Standard RIGHT join, unmatched probe rows are emitted as they're probed.
    Right,
    /// Standard full/outer join.
    Full,
}

impl JoinType {
    /// If unmatched probe rows should be emitted with null build columns.
    pub const fn is_probe_outer(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }

    /// If unmatched build rows should be emitted once the probe side is
    /// exhausted.
    pub const fn is_build_outer(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JoinType {
    type Err = colexec_error::DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "inner" => JoinType::Inner,
            "left" => JoinType::Left,
            "right" => JoinType::Right,
            "full" | "outer" => JoinType::Full,
            other => {
                return Err(colexec_error::DbError::new("Unknown join type")
                    .with_field("join_type", other));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert!(!JoinType::Inner.is_probe_outer());
        assert!(!JoinType::Inner.is_build_outer());
        assert!(JoinType::Right.is_probe_outer());
        assert!(!JoinType::Right.is_build_outer());
        assert!(JoinType::Left.is_build_outer());
        assert!(JoinType::Full.is_probe_outer() && JoinType::Full.is_build_outer());
    }

    #[test]
    fn parse() {
        assert_eq!(JoinType::Full, "OUTER".parse().unwrap());
        assert_eq!(JoinType::Left, "left".parse().unwrap());
        "cross".parse::<JoinType>().unwrap_err();
    }
}
