use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Parent,
    Child,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Admin => "admin",
            UserRole::Parent => "parent",
            UserRole::Child => "child",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "parent" => Ok(UserRole::Parent),
            "child" => Ok(UserRole::Child),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [UserRole::Admin, UserRole::Parent, UserRole::Child] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("super_admin".parse::<UserRole>().is_err());
    }
}
