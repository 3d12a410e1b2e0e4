//! Collapse duplicate source records before reconciliation.
//!
//! Two passes run on the wipers sheet:
//!
//! 1. [`consolidate_variants`] merges left- and right-hand-drive rows of one
//!    vehicle model when every wiper reference is identical.
//! 2. [`dedup_positions`] drops repeated position entries of one model once
//!    the vehicles are flattened into per-slot entries.

use std::collections::{HashMap, HashSet};

use partsync_core::normalize_name;
use partsync_source::{WiperSlot, WiperVehicle};

/// Merge rows of the same `(brand, model)` whose wiper references all match.
///
/// Group order and the order inside each group follow the input. A merged
/// record keeps the first row's identity, joins the distinct directions with
/// `/`, takes the earliest start date and the first present end date, and
/// notes how many rows it absorbed. Returns the records and the number of rows
/// merged away.
#[must_use]
pub fn consolidate_variants(vehicles: Vec<WiperVehicle>) -> (Vec<WiperVehicle>, usize) {
    let mut group_order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<WiperVehicle>> = HashMap::new();
    for vehicle in vehicles {
        let key = (normalize_name(&vehicle.brand), normalize_name(&vehicle.model));
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(vehicle);
    }

    let mut consolidated = Vec::new();
    let mut merged_away = 0usize;
    for key in group_order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let mut taken = vec![false; group.len()];
        for i in 0..group.len() {
            if taken[i] {
                continue;
            }
            taken[i] = true;
            let mut same: Vec<&WiperVehicle> = vec![&group[i]];
            for j in (i + 1)..group.len() {
                if !taken[j] && group[j].wipers == group[i].wipers {
                    taken[j] = true;
                    same.push(&group[j]);
                }
            }
            merged_away += same.len() - 1;
            consolidated.push(merge(&same));
        }
    }

    if merged_away > 0 {
        tracing::info!(merged_away, remaining = consolidated.len(), "consolidated drive variants");
    }
    (consolidated, merged_away)
}

fn merge(same: &[&WiperVehicle]) -> WiperVehicle {
    let mut merged = same[0].clone();
    if same.len() == 1 {
        return merged;
    }

    let mut directions: Vec<&str> = Vec::new();
    for v in same {
        let d = v.direction.as_str();
        if !d.is_empty() && !directions.contains(&d) {
            directions.push(d);
        }
    }
    merged.direction = directions.join("/");
    merged.start_date = same.iter().filter_map(|v| v.start_date).min();
    merged.end_date = same.iter().find_map(|v| v.end_date);
    let listed: Vec<&str> = same.iter().map(|v| v.direction.as_str()).collect();
    merged.notes = Some(format!(
        "Consolidated from {} entries: {}",
        same.len(),
        listed.join(", ")
    ));
    merged
}

/// One wiper reference of one vehicle model, in one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiperPosition {
    pub reference: Option<String>,
    pub slot: WiperSlot,
    pub brand: String,
    pub model: String,
    pub size: Option<String>,
    pub description: Option<String>,
    pub direction: String,
    pub notes: Option<String>,
}

/// Flatten vehicles into one entry per present slot, in input order.
#[must_use]
pub fn flatten_positions(vehicles: &[WiperVehicle]) -> Vec<WiperPosition> {
    vehicles
        .iter()
        .flat_map(|v| {
            v.wipers.present().map(move |(slot, reference)| WiperPosition {
                reference: Some(reference.to_owned()),
                slot,
                brand: v.brand.clone(),
                model: v.model.clone(),
                size: None,
                description: None,
                direction: v.direction.clone(),
                notes: v.notes.clone(),
            })
        })
        .collect()
}

fn norm(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

/// Duplicate key of a position entry, scoped to its model.
///
/// With a reference: `ref|position|brand`. Without one:
/// `position|brand|size|description`. Comparison is trimmed and
/// case-insensitive.
#[must_use]
pub fn position_key(entry: &WiperPosition) -> String {
    let model = norm(Some(&entry.model));
    let position = norm(Some(entry.slot.position_name()));
    let brand = norm(Some(&entry.brand));
    match entry.reference.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reference) => format!(
            "{model}#{}|{position}|{brand}",
            reference.to_lowercase()
        ),
        None => format!(
            "{model}#{position}|{brand}|{}|{}",
            norm(entry.size.as_deref()),
            norm(entry.description.as_deref())
        ),
    }
}

/// Keep the first entry for every [`position_key`]. Returns the kept entries
/// and the number dropped.
#[must_use]
pub fn dedup_positions(entries: Vec<WiperPosition>) -> (Vec<WiperPosition>, usize) {
    let before = entries.len();
    let mut seen = HashSet::new();
    let kept: Vec<WiperPosition> = entries
        .into_iter()
        .filter(|e| seen.insert(position_key(e)))
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        tracing::debug!(dropped, "dropped duplicate wiper positions");
    }
    (kept, dropped)
}

#[cfg(test)]
#[path = "dedup_test.rs"]
mod tests;
