//! Category classification.
//!
//! Maps a free-text category to a badge style and the extra/figurant flag.
//! Rules are tested in a fixed order and the first match wins, so
//! "Oyuncu/Figüran" is an actor while "Figüran/Yönetim" is an extra.

use crate::text::tr_lower;

/// Canonical categories offered when editing the roster.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "Oyuncu",
    "Figüran",
    "Figüran/Müzisyen",
    "Figüran/Yönetim",
    "Oyuncu/Figüran",
    "Koro/Dans",
    "Orkestra",
    "Tasarım",
    "Işık – Tasarım",
    "Işık Kontrol",
    "Kostüm",
    "Müzisyen",
    "Hareket / Koreografi",
    "Sahne Amiri",
    "Yönetim",
    "Yönetim/Figüran",
    "Ses – Kondüvit",
    "Ses-Kondüvit",
    "Dramaturgi",
    "Sahne Arkası",
    "Sahne Dekor (Sorumlu)",
    "Dekor/Aksesuar",
    "Video / Görüntü",
    "Peruk – Makyaj",
    "Sanatsal Denetim",
    "Uzman",
    "Yazar",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleClass {
    Actor,
    Extra,
    ChorusOrchestra,
    Design,
    Lighting,
    Costume,
    Musician,
    Choreography,
    StageManager,
    Management,
    Sound,
    Dramaturgy,
    Default,
}

impl StyleClass {
    /// Badge classes used by the web front end.
    pub fn css_class(self) -> &'static str {
        match self {
            StyleClass::Actor => "bg-blue-100 text-blue-800 dark:bg-blue-900/30 dark:text-blue-300",
            StyleClass::Extra => {
                "bg-purple-100 text-purple-800 dark:bg-purple-900/30 dark:text-purple-300"
            }
            StyleClass::ChorusOrchestra => {
                "bg-fuchsia-100 text-fuchsia-800 dark:bg-fuchsia-900/30 dark:text-fuchsia-300"
            }
            StyleClass::Design => {
                "bg-amber-100 text-amber-800 dark:bg-amber-900/30 dark:text-amber-300"
            }
            StyleClass::Lighting => {
                "bg-yellow-100 text-yellow-800 dark:bg-yellow-900/30 dark:text-yellow-300"
            }
            StyleClass::Costume => "bg-pink-100 text-pink-800 dark:bg-pink-900/30 dark:text-pink-300",
            StyleClass::Musician => {
                "bg-green-100 text-green-800 dark:bg-green-900/30 dark:text-green-300"
            }
            StyleClass::Choreography => {
                "bg-teal-100 text-teal-800 dark:bg-teal-900/30 dark:text-teal-300"
            }
            StyleClass::StageManager => {
                "bg-orange-100 text-orange-800 dark:bg-orange-900/30 dark:text-orange-300"
            }
            StyleClass::Management => {
                "bg-indigo-100 text-indigo-800 dark:bg-indigo-900/30 dark:text-indigo-300"
            }
            StyleClass::Sound => "bg-cyan-100 text-cyan-800 dark:bg-cyan-900/30 dark:text-cyan-300",
            StyleClass::Dramaturgy => {
                "bg-rose-100 text-rose-800 dark:bg-rose-900/30 dark:text-rose-300"
            }
            StyleClass::Default => "bg-secondary text-secondary-foreground",
        }
    }

    /// Short label for text reports.
    pub fn label(self) -> &'static str {
        match self {
            StyleClass::Actor => "actor",
            StyleClass::Extra => "extra",
            StyleClass::ChorusOrchestra => "chorus",
            StyleClass::Design => "design",
            StyleClass::Lighting => "lighting",
            StyleClass::Costume => "costume",
            StyleClass::Musician => "musician",
            StyleClass::Choreography => "choreography",
            StyleClass::StageManager => "stage-manager",
            StyleClass::Management => "management",
            StyleClass::Sound => "sound",
            StyleClass::Dramaturgy => "dramaturgy",
            StyleClass::Default => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub style: StyleClass,
    pub is_extra: bool,
}

enum Rule {
    Prefix(&'static [&'static str]),
    Extra,
}

/// Ordered rule table. Order is part of the contract.
const RULES: &[(Rule, StyleClass)] = &[
    (Rule::Prefix(&["Oyuncu"]), StyleClass::Actor),
    (Rule::Extra, StyleClass::Extra),
    (Rule::Prefix(&["Koro", "Orkestra"]), StyleClass::ChorusOrchestra),
    (Rule::Prefix(&["Tasarım"]), StyleClass::Design),
    (Rule::Prefix(&["Işık"]), StyleClass::Lighting),
    (Rule::Prefix(&["Kostüm"]), StyleClass::Costume),
    (Rule::Prefix(&["Müzisyen"]), StyleClass::Musician),
    (Rule::Prefix(&["Hareket"]), StyleClass::Choreography),
    (Rule::Prefix(&["Sahne Amiri"]), StyleClass::StageManager),
    (Rule::Prefix(&["Yönetim"]), StyleClass::Management),
    (Rule::Prefix(&["Ses"]), StyleClass::Sound),
    (Rule::Prefix(&["Dramaturgi"]), StyleClass::Dramaturgy),
];

/// True when the category names an extra/figurant role.
///
/// Both Turkish and plain lowercasing are tried so that "FİGÜRAN" and
/// "FIGURAN" are recognized alike.
pub fn is_extra(category: &str) -> bool {
    let trimmed = category.trim();
    [tr_lower(trimmed), trimmed.to_lowercase()]
        .iter()
        .any(|lower| lower.contains("figüran") || lower.contains("figuran"))
}

pub fn classify(category: &str) -> Classification {
    let trimmed = category.trim();
    let style = RULES
        .iter()
        .find(|(rule, _)| match rule {
            Rule::Prefix(prefixes) => prefixes.iter().any(|p| trimmed.starts_with(p)),
            Rule::Extra => is_extra(trimmed),
        })
        .map(|(_, style)| *style)
        .unwrap_or(StyleClass::Default);

    Classification {
        style,
        is_extra: is_extra(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_extra_spellings() {
        assert!(is_extra("Figüran"));
        assert!(is_extra("  FİGÜRAN "));
        assert!(is_extra("FIGURAN"));
        assert!(is_extra("Oyuncu/Figüran"));
        assert!(is_extra("Figuran"));
        assert!(!is_extra("Oyuncu"));
        assert!(!is_extra(""));
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify("Oyuncu/Figüran").style, StyleClass::Actor);
        assert!(classify("Oyuncu/Figüran").is_extra);
        assert_eq!(classify("Figüran/Yönetim").style, StyleClass::Extra);
        assert_eq!(classify("Yönetim/Figüran").style, StyleClass::Extra);
        assert_eq!(classify("Figüran/Müzisyen").style, StyleClass::Extra);
    }

    #[test]
    fn test_prefix_rules() {
        assert_eq!(classify("Koro/Dans").style, StyleClass::ChorusOrchestra);
        assert_eq!(classify("Orkestra").style, StyleClass::ChorusOrchestra);
        assert_eq!(classify("Işık – Tasarım").style, StyleClass::Lighting);
        assert_eq!(classify("Tasarım").style, StyleClass::Design);
        assert_eq!(classify(" Kostüm").style, StyleClass::Costume);
        assert_eq!(classify("Hareket / Koreografi").style, StyleClass::Choreography);
        assert_eq!(classify("Sahne Amiri").style, StyleClass::StageManager);
        assert_eq!(classify("Sahne Arkası").style, StyleClass::Default);
        assert_eq!(classify("Ses-Kondüvit").style, StyleClass::Sound);
        assert_eq!(classify("Dramaturgi").style, StyleClass::Dramaturgy);
        assert_eq!(classify("Yazar").style, StyleClass::Default);
        assert_eq!(classify("").style, StyleClass::Default);
    }

    #[test]
    fn test_classification_is_pure() {
        for cat in KNOWN_CATEGORIES {
            assert_eq!(classify(cat), classify(cat));
        }
    }
}
