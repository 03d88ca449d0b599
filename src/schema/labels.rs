//! Closed label sets used by stage outputs.
//!
//! Each set is a plain enum serialized as its Chinese label. Stage schemas
//! take their enum constraints from `LABELS`, and the day statistics read
//! validated outputs back through the same types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! closed_labels {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                $name::from_label(&label)
                    .ok_or_else(|| serde::de::Error::unknown_variant(&label, $name::LABELS))
            }
        }
    };
}

closed_labels! {
    /// How strongly the listing reasons signal intent
    SignalStrength {
        Strong => "强",
        Medium => "中",
        Weak => "弱",
    }
}

closed_labels! {
    /// Who won the day between buyers and sellers
    Verdict {
        BullsDecisive => "多方压倒性胜利",
        BullsNarrow => "多方惨胜",
        Balanced => "多空势均力敌",
        BearsNarrow => "空方惨胜",
        BearsDecisive => "空方压倒性胜利",
    }
}

closed_labels! {
    /// Shared scale for market sentiment and capital confrontation
    SentimentLevel {
        Euphoric => "亢奋",
        Optimistic => "乐观",
        Divided => "分歧",
        Contested => "博弈",
        Watching => "观望",
        Pessimistic => "悲观",
        Panic => "恐慌",
        Receding => "退潮",
    }
}

impl Verdict {
    pub fn is_bullish(self) -> bool {
        matches!(self, Verdict::BullsDecisive | Verdict::BullsNarrow)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Verdict::BearsDecisive | Verdict::BearsNarrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip_through_serde() {
        let json = serde_json::to_string(&Verdict::BullsNarrow).unwrap();
        assert_eq!(json, "\"多方惨胜\"");

        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Verdict::BullsNarrow);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = serde_json::from_str::<Verdict>("\"胜利\"").unwrap_err();
        assert!(err.to_string().contains("胜利"));
        assert_eq!(SignalStrength::from_label("很强"), None);
    }

    #[test]
    fn test_label_tables_line_up() {
        assert_eq!(SentimentLevel::ALL.len(), SentimentLevel::LABELS.len());
        for level in SentimentLevel::ALL {
            assert_eq!(SentimentLevel::from_label(level.label()), Some(*level));
        }
    }
}
