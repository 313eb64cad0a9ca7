//! Occupancy filter and free-text search over the flat list.
//!
//! Everything here is pure: the service loads one snapshot of flats and of
//! the `occupied_flats` view, then these functions derive the cards.

use crate::entities::{flat, occupied_flat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OccupancyFilter {
    #[default]
    All,
    Filled,
    Vacant,
}

/// A flat as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FlatCard {
    #[serde(flatten)]
    pub flat: flat::Model,
    /// Names of the active tenants, empty for vacant flats.
    pub tenant_names: Vec<String>,
    pub occupied: bool,
}

/// Identifiers present in the occupied view.
pub fn filled_ids(occupied: &[occupied_flat::Model]) -> HashSet<String> {
    occupied.iter().map(|o| o.flat_id.clone()).collect()
}

pub fn build_cards(flats: Vec<flat::Model>, occupied: &[occupied_flat::Model]) -> Vec<FlatCard> {
    let mut tenants: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for row in occupied {
        tenants
            .entry(row.flat_id.as_str())
            .or_default()
            .push(row.tenant_name.clone());
    }

    flats
        .into_iter()
        .map(|flat| {
            let tenant_names = tenants.get(flat.flat_id.as_str()).cloned().unwrap_or_default();
            FlatCard {
                occupied: !tenant_names.is_empty(),
                tenant_names,
                flat,
            }
        })
        .collect()
}

pub fn apply_filter(cards: &[FlatCard], filter: OccupancyFilter) -> Vec<FlatCard> {
    cards
        .iter()
        .filter(|card| match filter {
            OccupancyFilter::All => true,
            OccupancyFilter::Filled => card.occupied,
            OccupancyFilter::Vacant => !card.occupied,
        })
        .cloned()
        .collect()
}

/// Case-insensitive substring match on apartment name, flat id and tenant names.
/// A blank query matches everything.
pub fn matches_search(card: &FlatCard, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    card.flat.apartment_name.to_lowercase().contains(&needle)
        || card.flat.flat_id.to_lowercase().contains(&needle)
        || card
            .tenant_names
            .iter()
            .any(|name| name.to_lowercase().contains(&needle))
}

pub fn dashboard_view(cards: &[FlatCard], filter: OccupancyFilter, query: &str) -> Vec<FlatCard> {
    apply_filter(cards, filter)
        .into_iter()
        .filter(|card| matches_search(card, query))
        .collect()
}
