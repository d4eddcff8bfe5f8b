use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Sentinel stored in every field the model did not populate.
pub const UNKNOWN: &str = "Unknown";

/// The fixed field set of a product listing, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Sku,
    Brand,
    Model,
    Material,
    Color,
    Size,
    Year,
    Condition,
    PriceEstimate,
    ReferenceNumber,
    Notes,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Sku,
        Field::Brand,
        Field::Model,
        Field::Material,
        Field::Color,
        Field::Size,
        Field::Year,
        Field::Condition,
        Field::PriceEstimate,
        Field::ReferenceNumber,
        Field::Notes,
    ];

    /// Machine key used in JSON artifacts.
    pub fn key(self) -> &'static str {
        match self {
            Field::Sku => "sku",
            Field::Brand => "brand",
            Field::Model => "model",
            Field::Material => "material",
            Field::Color => "color",
            Field::Size => "size",
            Field::Year => "year",
            Field::Condition => "condition",
            Field::PriceEstimate => "price_estimate",
            Field::ReferenceNumber => "reference_number",
            Field::Notes => "notes",
        }
    }

    /// Human label used in text artifacts and the inventory header.
    pub fn label(self) -> &'static str {
        match self {
            Field::Sku => "SKU",
            Field::Brand => "Brand",
            Field::Model => "Model",
            Field::Material => "Material",
            Field::Color => "Color",
            Field::Size => "Size",
            Field::Year => "Year",
            Field::Condition => "Condition",
            Field::PriceEstimate => "Price Estimate",
            Field::ReferenceNumber => "Reference Number",
            Field::Notes => "Notes",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.label() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Normalized description of one product.
///
/// Every field always holds a value; anything the model did not provide
/// holds [`UNKNOWN`]. The SKU is never unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    values: [String; 11],
}

impl ProductRecord {
    /// A record with the given SKU and every other field unknown.
    pub fn new(sku: impl Into<String>) -> Self {
        let mut values: [String; 11] = std::array::from_fn(|_| UNKNOWN.to_string());
        values[Field::Sku.index()] = sku.into();
        Self { values }
    }

    pub fn sku(&self) -> &str {
        &self.values[Field::Sku.index()]
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    /// Set a field. Blank values reset it to [`UNKNOWN`]; a blank SKU is ignored.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            if field != Field::Sku {
                self.values[field.index()] = UNKNOWN.to_string();
            }
            return;
        }
        self.values[field.index()] = value.to_string();
    }

    pub fn is_known(&self, field: Field) -> bool {
        self.get(field) != UNKNOWN
    }

    /// Number of fields other than the SKU holding a real value.
    pub fn known_count(&self) -> usize {
        Field::ALL
            .iter()
            .filter(|f| **f != Field::Sku && self.is_known(**f))
            .count()
    }

    /// Fields and values in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Values in canonical order, as one inventory row.
    pub fn to_row(&self) -> Vec<String> {
        self.values.to_vec()
    }
}

impl Serialize for ProductRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::ALL.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProductRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = HashMap::<String, String>::deserialize(deserializer)?;
        let sku = map
            .get(Field::Sku.key())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| de::Error::missing_field("sku"))?;

        let mut record = ProductRecord::new(sku.trim());
        for field in Field::ALL {
            if let Some(value) = map.get(field.key()) {
                record.set(field, value.as_str());
            }
        }
        Ok(record)
    }
}

/// The images of one SKU folder, submitted together in one model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBatch {
    folder: PathBuf,
    default_sku: String,
    images: Vec<PathBuf>,
}

impl ImageBatch {
    /// Build a batch, ordering images by file name. Fails on an empty list.
    pub fn new(
        folder: impl Into<PathBuf>,
        default_sku: impl Into<String>,
        mut images: Vec<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let folder = folder.into();
        if images.is_empty() {
            return Err(PipelineError::EmptyFolder { folder });
        }
        sort_by_file_name(&mut images);
        Ok(Self {
            folder,
            default_sku: default_sku.into(),
            images,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn default_sku(&self) -> &str {
        &self.default_sku
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keep only the first `max` images. Returns how many were dropped.
    /// A batch is never cut below one image.
    pub fn truncate(&mut self, max: usize) -> usize {
        let keep = max.max(1);
        let dropped = self.images.len().saturating_sub(keep);
        self.images.truncate(keep);
        dropped
    }

    pub fn file_names(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Lexicographic order on the file name, full path as tie-breaker.
pub fn sort_by_file_name(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
}
