//! Reference entities that get folded into chatbot prompts, and the tier
//! ladder derived from rating points.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse rank derived from accumulated rating points.
///
/// Never stored: always recomputed from points so the two cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Tier(pub u8);

impl Tier {
    /// Minimum points for tiers 1, 2 and 3.
    pub const THRESHOLDS: [f64; 3] = [10.0, 20.0, 30.0];

    pub fn from_points(points: f64) -> Self {
        let reached = Self::THRESHOLDS.iter().filter(|t| points >= **t).count();
        Tier(reached as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

/// Selects which reference set is flattened into the directory snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DirectorySource {
    Users,
    Suppliers,
}

impl DirectorySource {
    /// Noun used in the prompt preamble.
    pub fn noun(self) -> &'static str {
        match self {
            DirectorySource::Users => "users",
            DirectorySource::Suppliers => "suppliers",
        }
    }
}

/// Anything that can be serialized into one snapshot line.
pub trait DirectoryEntry {
    /// Ordered `(key, value)` pairs; empty values are dropped by
    /// [`DirectoryEntry::directory_line`].
    fn fields(&self) -> Vec<(&'static str, String)>;

    fn directory_line(&self) -> String {
        self.fields()
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Public projection of a user as seen by the chatbot. Contact data and
/// credentials are never part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub username: String,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
    pub points: f64,
}

impl DirectoryEntry for DirectoryUser {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let tier = Tier::from_points(self.points);
        let points = if self.points != 0.0 {
            self.points.to_string()
        } else {
            String::new()
        };
        let tier = if tier.level() != 0 {
            tier.level().to_string()
        } else {
            String::new()
        };
        vec![
            ("username", self.username.clone()),
            ("businessName", self.business_name.clone().unwrap_or_default()),
            ("location", self.location.clone().unwrap_or_default()),
            ("interests", self.interests.clone().unwrap_or_default()),
            ("expertise", self.expertise.clone().unwrap_or_default()),
            ("points", points),
            ("tier", tier),
        ]
    }
}

/// A supplier in the reference directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub location: String,
    pub supplies: Vec<String>,
}

impl DirectoryEntry for Supplier {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("location", self.location.clone()),
            ("supplies", self.supplies.join(", ")),
        ]
    }
}

/// Join every entry's line with `\n`, keeping input order.
pub fn render_snapshot<E: DirectoryEntry>(entries: &[E]) -> String {
    entries
        .iter()
        .map(DirectoryEntry::directory_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_follows_fixed_thresholds() {
        let points = [0.0, 9.0, 10.0, 19.0, 20.0, 29.0, 30.0];
        let tiers: Vec<u8> = points.iter().map(|p| Tier::from_points(*p).level()).collect();
        assert_eq!(tiers, vec![0, 0, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn tier_handles_fractional_points() {
        assert_eq!(Tier::from_points(9.5).level(), 0);
        assert_eq!(Tier::from_points(45.5).level(), 3);
    }

    #[test]
    fn user_line_omits_empty_fields() {
        let user = DirectoryUser {
            username: "alice".into(),
            business_name: Some("Alice Farms".into()),
            location: Some(String::new()),
            interests: None,
            expertise: Some("dairy".into()),
            points: 0.0,
        };
        assert_eq!(
            user.directory_line(),
            "username: alice, businessName: Alice Farms, expertise: dairy"
        );
    }

    #[test]
    fn user_line_carries_points_and_tier() {
        let user = DirectoryUser {
            username: "bob".into(),
            points: 21.0,
            ..Default::default()
        };
        assert_eq!(user.directory_line(), "username: bob, points: 21, tier: 2");
    }

    #[test]
    fn supplier_line_joins_supplies() {
        let s = Supplier {
            id: "1".into(),
            name: "Acme".into(),
            location: "Lyon".into(),
            supplies: vec!["flour".into(), "yeast".into()],
        };
        assert_eq!(s.directory_line(), "name: Acme, location: Lyon, supplies: flour, yeast");
    }

    #[test]
    fn snapshot_is_one_line_per_entry() {
        let users = vec![
            DirectoryUser { username: "a".into(), ..Default::default() },
            DirectoryUser { username: "b".into(), ..Default::default() },
        ];
        assert_eq!(render_snapshot(&users), "username: a\nusername: b");
        assert_eq!(render_snapshot::<DirectoryUser>(&[]), "");
    }

    #[test]
    fn directory_source_parses_case_insensitively() {
        assert_eq!("Suppliers".parse::<DirectorySource>().unwrap(), DirectorySource::Suppliers);
        assert!("posts".parse::<DirectorySource>().is_err());
    }
}
