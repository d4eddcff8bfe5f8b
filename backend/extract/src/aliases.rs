//! Field label alias table.
//!
//! Keys and line labels are canonicalized (lowercased, runs of non
//! alphanumerics collapsed to `_`) and then looked up here. Anything not
//! listed is not a field and ends up in the notes.

use skuforge_core::Field;

static ALIASES: &[(&str, Field)] = &[
    // sku
    ("sku", Field::Sku),
    ("sku_code", Field::Sku),
    ("product_sku", Field::Sku),
    ("item_sku", Field::Sku),
    ("stock_code", Field::Sku),
    // brand
    ("brand", Field::Brand),
    ("brand_name", Field::Brand),
    ("designer", Field::Brand),
    ("maker", Field::Brand),
    ("manufacturer", Field::Brand),
    // model
    ("model", Field::Model),
    ("model_name", Field::Model),
    ("style", Field::Model),
    ("product_model", Field::Model),
    // material
    ("material", Field::Material),
    ("materials", Field::Material),
    ("fabric", Field::Material),
    ("material_description", Field::Material),
    // color
    ("color", Field::Color),
    ("colour", Field::Color),
    ("colors", Field::Color),
    ("colours", Field::Color),
    ("main_color", Field::Color),
    ("main_colour", Field::Color),
    ("color_description", Field::Color),
    // size
    ("size", Field::Size),
    ("size_information", Field::Size),
    ("dimensions", Field::Size),
    // year
    ("year", Field::Year),
    ("year_of_production", Field::Year),
    ("production_year", Field::Year),
    ("year_made", Field::Year),
    ("manufacture_year", Field::Year),
    // condition
    ("condition", Field::Condition),
    ("condition_grade", Field::Condition),
    ("grade", Field::Condition),
    ("condition_rating", Field::Condition),
    // price estimate
    ("price_estimate", Field::PriceEstimate),
    ("estimated_price", Field::PriceEstimate),
    ("price", Field::PriceEstimate),
    ("recommended_selling_price", Field::PriceEstimate),
    ("recommended_price", Field::PriceEstimate),
    ("selling_price", Field::PriceEstimate),
    ("estimated_price_range", Field::PriceEstimate),
    ("price_range", Field::PriceEstimate),
    ("estimated_value", Field::PriceEstimate),
    // reference number
    ("reference_number", Field::ReferenceNumber),
    ("reference", Field::ReferenceNumber),
    ("reference_no", Field::ReferenceNumber),
    ("ref", Field::ReferenceNumber),
    ("ref_no", Field::ReferenceNumber),
    ("ref_number", Field::ReferenceNumber),
    ("serial_number", Field::ReferenceNumber),
    ("serial", Field::ReferenceNumber),
    ("serial_no", Field::ReferenceNumber),
    ("date_code", Field::ReferenceNumber),
    // notes
    ("notes", Field::Notes),
    ("note", Field::Notes),
    ("comments", Field::Notes),
    ("remarks", Field::Notes),
    ("details", Field::Notes),
    ("description", Field::Notes),
    ("condition_description", Field::Notes),
];

/// Lowercase and collapse every run of non-alphanumerics to one `_`.
pub fn canonical_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Resolve a JSON key or line label to a field.
pub fn resolve(label: &str) -> Option<Field> {
    let key = canonical_key(label);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_labels() {
        assert_eq!(canonical_key("Year of Production"), "year_of_production");
        assert_eq!(canonical_key("  Ref No. "), "ref_no");
        assert_eq!(canonical_key("Sub-category"), "sub_category");
        assert_eq!(canonical_key("price__estimate"), "price_estimate");
    }

    #[test]
    fn resolves_common_variants() {
        assert_eq!(resolve("Colour"), Some(Field::Color));
        assert_eq!(resolve("COLOR"), Some(Field::Color));
        assert_eq!(resolve("ref no"), Some(Field::ReferenceNumber));
        assert_eq!(resolve("Serial Number"), Some(Field::ReferenceNumber));
        assert_eq!(resolve("Recommended Selling Price"), Some(Field::PriceEstimate));
        assert_eq!(resolve("price-estimate"), Some(Field::PriceEstimate));
        assert_eq!(resolve("Condition Grade"), Some(Field::Condition));
        assert_eq!(resolve("Year of Production"), Some(Field::Year));
    }

    #[test]
    fn every_canonical_key_resolves_to_itself() {
        for field in Field::ALL {
            assert_eq!(resolve(field.key()), Some(field));
            assert_eq!(resolve(field.label()), Some(field));
        }
    }

    #[test]
    fn unrelated_labels_do_not_resolve() {
        assert_eq!(resolve("Category"), None);
        assert_eq!(resolve("Retail Price"), None);
        assert_eq!(resolve("https"), None);
    }

    #[test]
    fn alias_table_has_no_duplicates() {
        let mut keys: Vec<&str> = ALIASES.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }
}
