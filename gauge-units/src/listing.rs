//! Structured listing of every registered unit, grouped by dimensionality

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::registry::UnitRegistry;

/// Bucket key for dimensionless units
pub const DIMENSIONLESS_KEY: &str = "[]";

/// One unit in a listing: canonical name plus its other spellings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub name: String,
    /// Symbol first, then aliases
    pub aliases: Vec<String>,
}

/// Units sharing one dimensionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionGroup {
    /// Dimensionality text (`[length] / [time]`), or `[]`
    pub dimensionality: String,
    /// Named dimensions that reduce to this dimensionality (`[velocity]`)
    pub aliases: Vec<String>,
    pub units: Vec<UnitEntry>,
}

impl DimensionGroup {
    fn new(dimensionality: String) -> Self {
        DimensionGroup {
            dimensionality,
            aliases: Vec::new(),
            units: Vec::new(),
        }
    }
}

/// Groups ordered by increasing length of their dimensionality text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitListing {
    pub groups: Vec<DimensionGroup>,
}

impl UnitListing {
    pub fn get(&self, dimensionality: &str) -> Option<&DimensionGroup> {
        self.groups.iter().find(|g| g.dimensionality == dimensionality)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionGroup> + '_ {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group containing a unit, by canonical name or any listed spelling
    pub fn group_of(&self, unit: &str) -> Option<&DimensionGroup> {
        self.groups.iter().find(|g| {
            g.units
                .iter()
                .any(|u| u.name == unit || u.aliases.iter().any(|a| a == unit))
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a UnitListing {
    type Item = &'a DimensionGroup;
    type IntoIter = std::slice::Iter<'a, DimensionGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl UnitRegistry {
    /// Every registered unit bucketed by dimensionality.
    ///
    /// Declared dimensions are listed as aliases of the bucket they reduce
    /// to, unless their own name is already a bucket key. When several
    /// declarations reduce to the same bucket they appear in declaration
    /// order.
    pub fn list_units(&self) -> UnitListing {
        let mut groups: Vec<DimensionGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        let mut bucket = |key: String, groups: &mut Vec<DimensionGroup>| -> usize {
            *index.entry(key.clone()).or_insert_with(|| {
                groups.push(DimensionGroup::new(key));
                groups.len() - 1
            })
        };

        for unit in self.units() {
            let key = if unit.dimension.is_dimensionless() {
                DIMENSIONLESS_KEY.to_string()
            } else {
                unit.dimension.to_string()
            };
            let i = bucket(key, &mut groups);
            groups[i].units.push(UnitEntry {
                name: unit.name.clone(),
                aliases: unit.spellings().skip(1).map(str::to_string).collect(),
            });
        }

        for decl in self.dimensions() {
            if groups.iter().any(|g| g.dimensionality == decl.name) {
                continue;
            }
            let key = if decl.dimension.is_dimensionless() {
                DIMENSIONLESS_KEY.to_string()
            } else {
                decl.dimension.to_string()
            };
            let i = bucket(key, &mut groups);
            groups[i].aliases.push(decl.name.clone());
        }

        groups.sort_by_key(|g| g.dimensionality.chars().count());
        UnitListing { groups }
    }
}
