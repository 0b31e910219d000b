//! Prompt construction for portrait generation.
//!
//! Prompts are assembled from fixed framing fragments around a race fragment
//! and an optional class fragment. Races and classes form closed tag sets;
//! names outside those sets fall back to the name itself.

/// Opening style fragments, in order.
pub const STYLE_PREAMBLE: &[&str] = &[
    "Fantasy D&D character portrait in classic fantasy art style",
    "high contrast dramatic lighting",
];

/// Closing composition fragment.
pub const COMPOSITION_FRAGMENT: &str =
    "full body portrait centered composition fantasy art style detailed";

/// Separator placed between fragments.
const FRAGMENT_SEPARATOR: &str = ", ";

/// Known races with dedicated descriptive fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    Dwarf,
    Elf,
    Halfling,
    Human,
    Dragonborn,
    Gnome,
    HalfElf,
    HalfOrc,
    Tiefling,
}

impl Race {
    /// Every known race, in roster order.
    pub const ALL: [Race; 9] = [
        Race::Dwarf,
        Race::Elf,
        Race::Halfling,
        Race::Human,
        Race::Dragonborn,
        Race::Gnome,
        Race::HalfElf,
        Race::HalfOrc,
        Race::Tiefling,
    ];

    /// Look up a race tag case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lower = tag.trim().to_lowercase();
        Self::ALL.iter().copied().find(|r| r.tag() == lower)
    }

    /// Lowercase tag used for lookup.
    pub fn tag(&self) -> &'static str {
        match self {
            Race::Dwarf => "dwarf",
            Race::Elf => "elf",
            Race::Halfling => "halfling",
            Race::Human => "human",
            Race::Dragonborn => "dragonborn",
            Race::Gnome => "gnome",
            Race::HalfElf => "half-elf",
            Race::HalfOrc => "half-orc",
            Race::Tiefling => "tiefling",
        }
    }

    /// Display name used in rosters.
    pub fn display_name(&self) -> &'static str {
        match self {
            Race::Dwarf => "Dwarf",
            Race::Elf => "Elf",
            Race::Halfling => "Halfling",
            Race::Human => "Human",
            Race::Dragonborn => "Dragonborn",
            Race::Gnome => "Gnome",
            Race::HalfElf => "Half-Elf",
            Race::HalfOrc => "Half-Orc",
            Race::Tiefling => "Tiefling",
        }
    }

    pub fn fragment(&self) -> &'static str {
        match self {
            Race::Dwarf => "dwarf with a thick beard and stocky build",
            Race::Elf => "elf with pointed ears and graceful features",
            Race::Halfling => "halfling small and cheerful",
            Race::Human => "human with average features",
            Race::Dragonborn => "dragonborn with scaled skin and dragon-like features",
            Race::Gnome => "gnome with small stature and clever expression",
            Race::HalfElf => "half-elf with subtle pointed ears",
            Race::HalfOrc => "half-orc with muscular build and tusks",
            Race::Tiefling => "tiefling with horns and a tail",
        }
    }
}

/// Known classes with dedicated descriptive fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl Class {
    /// Every known class, in roster order.
    pub const ALL: [Class; 12] = [
        Class::Barbarian,
        Class::Bard,
        Class::Cleric,
        Class::Druid,
        Class::Fighter,
        Class::Monk,
        Class::Paladin,
        Class::Ranger,
        Class::Rogue,
        Class::Sorcerer,
        Class::Warlock,
        Class::Wizard,
    ];

    /// Look up a class tag case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lower = tag.trim().to_lowercase();
        Self::ALL.iter().copied().find(|c| c.tag() == lower)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Class::Barbarian => "barbarian",
            Class::Bard => "bard",
            Class::Cleric => "cleric",
            Class::Druid => "druid",
            Class::Fighter => "fighter",
            Class::Monk => "monk",
            Class::Paladin => "paladin",
            Class::Ranger => "ranger",
            Class::Rogue => "rogue",
            Class::Sorcerer => "sorcerer",
            Class::Warlock => "warlock",
            Class::Wizard => "wizard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Class::Barbarian => "Barbarian",
            Class::Bard => "Bard",
            Class::Cleric => "Cleric",
            Class::Druid => "Druid",
            Class::Fighter => "Fighter",
            Class::Monk => "Monk",
            Class::Paladin => "Paladin",
            Class::Ranger => "Ranger",
            Class::Rogue => "Rogue",
            Class::Sorcerer => "Sorcerer",
            Class::Warlock => "Warlock",
            Class::Wizard => "Wizard",
        }
    }

    pub fn fragment(&self) -> &'static str {
        match self {
            Class::Barbarian => "with wild hair wielding a massive axe",
            Class::Bard => "with musical instrument and colorful clothes",
            Class::Cleric => "in religious robes with holy symbol",
            Class::Druid => "in natural robes with vines and leaves",
            Class::Fighter => "wearing heavy armor and holding a sword",
            Class::Monk => "in simple robes in martial stance",
            Class::Paladin => "in shining armor with a holy shield",
            Class::Ranger => "with bow and forest gear",
            Class::Rogue => "in dark leather armor with daggers",
            Class::Sorcerer => "with magical energy swirling around",
            Class::Warlock => "with dark robes and eldritch symbols glowing",
            Class::Wizard => "in flowing robes holding a staff with magical aura",
        }
    }
}

/// Errors raised while building a prompt.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PromptBuildError {
    #[error("race name is empty")]
    EmptyRace,
}

/// Fragment for a race, falling back to the name verbatim.
pub fn race_fragment(race: &str) -> String {
    match Race::from_tag(race) {
        Some(known) => known.fragment().to_string(),
        None => race.trim().to_string(),
    }
}

/// Fragment for a class, falling back to "as a <class>".
pub fn class_fragment(class: &str) -> String {
    match Class::from_tag(class) {
        Some(known) => known.fragment().to_string(),
        None => format!("as a {}", class.trim()),
    }
}

/// Build the generation prompt for a race and optional class.
///
/// Output is a pure function of the inputs: preamble, race fragment, class
/// fragment (if any), then the composition fragment, joined by ", ".
pub fn build(race: &str, class: Option<&str>) -> Result<String, PromptBuildError> {
    if race.trim().is_empty() {
        return Err(PromptBuildError::EmptyRace);
    }

    let mut parts: Vec<String> = STYLE_PREAMBLE.iter().map(|s| s.to_string()).collect();
    parts.push(race_fragment(race));
    if let Some(class) = class.filter(|c| !c.trim().is_empty()) {
        parts.push(class_fragment(class));
    }
    parts.push(COMPOSITION_FRAGMENT.to_string());

    Ok(parts.join(FRAGMENT_SEPARATOR))
}

/// Default race roster (display names).
pub fn default_races() -> Vec<String> {
    Race::ALL.iter().map(|r| r.display_name().to_string()).collect()
}

/// Default class roster (display names).
pub fn default_classes() -> Vec<String> {
    Class::ALL.iter().map(|c| c.display_name().to_string()).collect()
}
