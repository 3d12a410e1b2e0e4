//! Validated source records.
//!
//! Every loader turns its raw file into one of these shapes. Anything that
//! fails validation is reported as a [`DroppedRow`] and never reaches the
//! reconciler.

use chrono::NaiveDate;
use partsync_core::ProductLine;
use serde::Serialize;

use crate::wipers_csv::WiperLayout;

/// A source row rejected at the loader boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    /// 1-based line for CSV files, 1-based array position for JSON files.
    pub line: usize,
    pub reason: String,
}

impl DroppedRow {
    pub(crate) fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Records that passed validation plus the rows that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub dropped: Vec<DroppedRow>,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRecord {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub name: String,
    pub brand_slug: String,
    pub model_slug: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub reference: String,
    pub brand: String,
    pub model: String,
    pub position: String,
    pub category: String,
    pub line: ProductLine,
    pub description: Option<String>,
}

/// The eight wiper slots of the catalog's master position list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WiperSlot {
    KitAvant,
    MultiCoteConducteur,
    MultiMonoBalais,
    MultiCotePassager,
    StandardCoteConducteur,
    StandardMonoBalais,
    StandardCotePassager,
    Arriere,
}

impl WiperSlot {
    pub const ALL: [WiperSlot; 8] = [
        WiperSlot::KitAvant,
        WiperSlot::MultiCoteConducteur,
        WiperSlot::MultiMonoBalais,
        WiperSlot::MultiCotePassager,
        WiperSlot::StandardCoteConducteur,
        WiperSlot::StandardMonoBalais,
        WiperSlot::StandardCotePassager,
        WiperSlot::Arriere,
    ];

    /// Position name as stored in the catalog.
    #[must_use]
    pub fn position_name(self) -> &'static str {
        match self {
            WiperSlot::KitAvant => "Kit Avant",
            WiperSlot::MultiCoteConducteur => "Côté Conducteur",
            WiperSlot::MultiMonoBalais => "Mono Balais",
            WiperSlot::MultiCotePassager => "Côté Passager",
            WiperSlot::StandardCoteConducteur => "Côté Conducteur Standard",
            WiperSlot::StandardMonoBalais => "Mono Balais Standard",
            WiperSlot::StandardCotePassager => "Côté Passager Standard",
            WiperSlot::Arriere => "Arrière",
        }
    }

    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            WiperSlot::KitAvant
            | WiperSlot::MultiCoteConducteur
            | WiperSlot::MultiMonoBalais
            | WiperSlot::MultiCotePassager => "multiconnexion",
            WiperSlot::StandardCoteConducteur
            | WiperSlot::StandardMonoBalais
            | WiperSlot::StandardCotePassager => "standard",
            WiperSlot::Arriere => "arriere",
        }
    }

    #[must_use]
    pub fn sort_order(self) -> i32 {
        match self {
            WiperSlot::KitAvant => 1,
            WiperSlot::MultiCoteConducteur => 2,
            WiperSlot::MultiMonoBalais => 3,
            WiperSlot::MultiCotePassager => 4,
            WiperSlot::StandardCoteConducteur => 5,
            WiperSlot::StandardMonoBalais => 6,
            WiperSlot::StandardCotePassager => 7,
            WiperSlot::Arriere => 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticonnexionRefs {
    pub kit_avant: Option<String>,
    pub cote_conducteur: Option<String>,
    pub mono_balais: Option<String>,
    pub cote_passager: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardRefs {
    pub cote_conducteur: Option<String>,
    pub mono_balais: Option<String>,
    pub cote_passager: Option<String>,
}

/// Wiper references of one vehicle, grouped the way the source sheet
/// groups its columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WiperRefs {
    pub multiconnexion: MulticonnexionRefs,
    pub standard: StandardRefs,
    pub arriere: Option<String>,
}

impl WiperRefs {
    #[must_use]
    pub fn get(&self, slot: WiperSlot) -> Option<&str> {
        let value = match slot {
            WiperSlot::KitAvant => &self.multiconnexion.kit_avant,
            WiperSlot::MultiCoteConducteur => &self.multiconnexion.cote_conducteur,
            WiperSlot::MultiMonoBalais => &self.multiconnexion.mono_balais,
            WiperSlot::MultiCotePassager => &self.multiconnexion.cote_passager,
            WiperSlot::StandardCoteConducteur => &self.standard.cote_conducteur,
            WiperSlot::StandardMonoBalais => &self.standard.mono_balais,
            WiperSlot::StandardCotePassager => &self.standard.cote_passager,
            WiperSlot::Arriere => &self.arriere,
        };
        value.as_deref()
    }

    /// Slots carrying a reference, in sort order.
    pub fn present(&self) -> impl Iterator<Item = (WiperSlot, &str)> + '_ {
        WiperSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|r| (slot, r)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// One vehicle row of the wipers sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WiperVehicle {
    #[serde(skip)]
    pub line: usize,
    pub source_id: String,
    pub brand: String,
    pub model: String,
    pub picto1: Option<String>,
    pub picto2: Option<String>,
    pub direction: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub wipers: WiperRefs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    BrandsJson,
    ModelsJson,
    ProductsJson,
    WipersCsv(WiperLayout),
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::BrandsJson => write!(f, "brands-json"),
            SourceFormat::ModelsJson => write!(f, "models-json"),
            SourceFormat::ProductsJson => write!(f, "products-json"),
            SourceFormat::WipersCsv(layout) => write!(f, "wipers-csv ({layout})"),
        }
    }
}

/// A loaded source file, one variant per format.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceBatch {
    Brands(Loaded<BrandRecord>),
    Models(Loaded<ModelRecord>),
    Products(Loaded<ProductRecord>),
    Wipers(Loaded<WiperVehicle>),
}

impl SourceBatch {
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            SourceBatch::Brands(l) => l.records.len(),
            SourceBatch::Models(l) => l.records.len(),
            SourceBatch::Products(l) => l.records.len(),
            SourceBatch::Wipers(l) => l.records.len(),
        }
    }

    #[must_use]
    pub fn dropped(&self) -> &[DroppedRow] {
        match self {
            SourceBatch::Brands(l) => &l.dropped,
            SourceBatch::Models(l) => &l.dropped,
            SourceBatch::Products(l) => &l.dropped,
            SourceBatch::Wipers(l) => &l.dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partsync_core::slugify;

    #[test]
    fn master_positions_have_unique_slugs_and_orders() {
        let mut slugs: Vec<String> = WiperSlot::ALL
            .iter()
            .map(|s| slugify(s.position_name()))
            .collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), 8);

        let orders: Vec<i32> = WiperSlot::ALL.iter().map(|s| s.sort_order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn present_lists_slots_in_sort_order() {
        let refs = WiperRefs {
            standard: StandardRefs {
                cote_conducteur: Some("VS35".into()),
                ..StandardRefs::default()
            },
            arriere: Some("VS17".into()),
            ..WiperRefs::default()
        };
        let present: Vec<_> = refs.present().collect();
        assert_eq!(
            present,
            vec![
                (WiperSlot::StandardCoteConducteur, "VS35"),
                (WiperSlot::Arriere, "VS17")
            ]
        );
        assert!(!refs.is_empty());
        assert!(WiperRefs::default().is_empty());
    }
}
