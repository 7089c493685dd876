//! Upsert decisions.
//!
//! [`plan_upsert`] compares one definition with the values currently stored
//! for its kind and decides what, if anything, has to change. It performs no
//! I/O; the engine executes the resulting [`UpsertPlan`].

use crate::canonical::{
    OidParseError, extract_oid, normalize, ordering_prefix, strip_ordering_prefix,
};
use crate::schema::SchemaDefinition;

/// The mutation needed to bring one definition into the stored value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertPlan {
    /// A stored value already matches after normalization.
    AlreadyPresent,
    /// No stored value shares the identifier: append the definition.
    Add { value: Vec<u8> },
    /// A stored value shares the identifier but differs: replace the whole
    /// value set with `values`, in which the stale value has been swapped for
    /// the new definition.
    Replace {
        previous: Vec<u8>,
        values: Vec<Vec<u8>>,
    },
}

impl UpsertPlan {
    /// The value set that results from executing this plan.
    pub fn apply(&self, stored: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        match self {
            UpsertPlan::AlreadyPresent => stored,
            UpsertPlan::Add { value } => {
                let mut values = stored;
                values.push(value.clone());
                values
            }
            UpsertPlan::Replace { values, .. } => values.clone(),
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, UpsertPlan::AlreadyPresent)
    }
}

/// Whether a stored value matches the normalized form of a definition.
///
/// The `{n}` ordering prefix the server adds to stored values is ignored.
pub fn stored_value_matches(stored: &[u8], normalized: &[u8]) -> bool {
    normalize(strip_ordering_prefix(stored)) == normalized
}

fn stored_oid(stored: &[u8]) -> Option<&str> {
    std::str::from_utf8(stored)
        .ok()
        .and_then(|text| extract_oid(text).ok())
}

/// Decide how to upsert `definition` into `stored`.
///
/// # Errors
/// Fails only when the definition is new (no normalized match) and its object
/// identifier cannot be parsed. Stored values without a parsable identifier
/// never match by identifier.
pub fn plan_upsert(
    stored: &[Vec<u8>],
    definition: &SchemaDefinition,
) -> Result<UpsertPlan, OidParseError> {
    let wanted = definition.normalized();
    if stored.iter().any(|value| stored_value_matches(value, &wanted)) {
        return Ok(UpsertPlan::AlreadyPresent);
    }

    let oid = definition.oid()?;
    let shares_oid = |value: &[u8]| stored_oid(value) == Some(oid);

    let Some(position) = stored.iter().position(|value| shares_oid(value.as_slice())) else {
        return Ok(UpsertPlan::Add {
            value: definition.text().as_bytes().to_vec(),
        });
    };

    let previous = &stored[position];
    // Keep the stale value's position in ordered attributes.
    let mut replacement = ordering_prefix(previous).map(<[u8]>::to_vec).unwrap_or_default();
    replacement.extend_from_slice(definition.text().as_bytes());

    // One definition per identifier: later duplicates of the stale one go too.
    let values = stored
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            if index == position {
                Some(replacement.clone())
            } else if shares_oid(value.as_slice()) {
                None
            } else {
                Some(value.clone())
            }
        })
        .collect();

    Ok(UpsertPlan::Replace {
        previous: previous.clone(),
        values,
    })
}
