//! Combination keys identifying a race-only or race×class portrait target.

use std::fmt;

/// A race-only or race×class rendering target.
///
/// The slug is derived once at construction (`race` or `race-class`,
/// lowercase) and is used to name every artifact belonging to the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationKey {
    race: String,
    class: Option<String>,
    slug: String,
}

impl CombinationKey {
    /// Key for a race-only portrait.
    pub fn race(race: &str) -> Self {
        Self::new(race, None)
    }

    /// Key for a race×class portrait.
    pub fn race_class(race: &str, class: &str) -> Self {
        Self::new(race, Some(class))
    }

    /// Build a key from a race and an optional class.
    pub fn new(race: &str, class: Option<&str>) -> Self {
        let race = race.trim().to_string();
        let class = class.map(|c| c.trim().to_string());
        let slug = match &class {
            Some(c) => format!("{}-{}", slugify(&race), slugify(c)),
            None => slugify(&race),
        };
        Self { race, class, slug }
    }

    /// The race name as given.
    pub fn race_name(&self) -> &str {
        &self.race
    }

    /// The class name as given, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The lowercase slug (`race` or `race-class`).
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// True for race×class keys.
    pub fn has_class(&self) -> bool {
        self.class.is_some()
    }

    /// Race and class names as given, separated by a space.
    pub fn title(&self) -> String {
        match &self.class {
            Some(c) => format!("{} {}", self.race, c),
            None => self.race.clone(),
        }
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)
    }
}

/// Lowercase a name and collapse whitespace runs into single hyphens.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Enumerate the full key universe: every race-only key, then every
/// race×class key in race-major order.
pub fn enumerate_keys(races: &[String], classes: &[String]) -> Vec<CombinationKey> {
    let mut keys = Vec::with_capacity(races.len() * (classes.len() + 1));
    keys.extend(races.iter().map(|r| CombinationKey::race(r)));
    for race in races {
        for class in classes {
            keys.push(CombinationKey::race_class(race, class));
        }
    }
    keys
}
