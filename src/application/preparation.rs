//! Payload preparation: turning cleaned catalog rows into the titles, tags,
//! prices, metafields and images sent to the remote platform.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::catalog::{NewImage, NewMetafield};
use crate::domain::record::{RawRow, parse_grams, parse_price, parse_stock};
use crate::domain::reference::{ProductGroup, REFERENCE_COLUMN, variant_size};

static KARAT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(18K|9k)\s*").expect("valid karat prefix pattern"));

/// Metafield keys stored as decimals; everything else is plain text.
const DECIMAL_METAFIELDS: [&str; 5] = ["alto", "ancho", "grosor", "largo", "quilates"];

/// Product-level data ready to be sent to the remote platform.
#[derive(Debug, Clone)]
pub struct PreparedProduct {
    pub title: String,
    pub body_html: String,
    pub product_type: String,
    pub tags: String,
    pub sku: String,
    pub price: f64,
    pub stock: i64,
    pub grams: i64,
    pub cost: f64,
    pub metafields: Vec<NewMetafield>,
    pub images: Vec<NewImage>,
}

/// One size variant ready to be sent to the remote platform.
#[derive(Debug, Clone)]
pub struct PreparedVariant {
    pub size: String,
    pub price: f64,
    pub sku: String,
    pub stock: i64,
    pub grams: i64,
    pub cost: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First letter uppercased, the rest lowercased.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Product title: base reference plus the description with any leading karat
/// marker (18K/9k) stripped and the remainder capitalized.
pub fn format_title(base_reference: &str, description: &str) -> String {
    if description.is_empty() {
        return base_reference.to_string();
    }
    let stripped = KARAT_PREFIX.replace(description, "");
    format!("{base_reference} - {}", capitalize(&stripped))
}

/// Material inferred from the karat marker at the start of the description.
pub fn material_from_description(description: &str) -> String {
    let upper = description.to_uppercase();
    if upper.starts_with("18K") {
        "Oro 18 kilates".to_string()
    } else if upper.starts_with("9K") {
        "Oro 9 kilates".to_string()
    } else {
        String::new()
    }
}

/// Combine category, subcategory and (for a few pluralizable types) the
/// product type into a comma-separated tag list.
pub fn process_tags(category: &str, subcategory: &str, product_type: &str) -> String {
    let mut tags: Vec<String> = [category, subcategory]
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let type_norm = capitalize(product_type.trim());
    if matches!(type_norm.as_str(), "Solitario" | "Alianza" | "Sello") {
        tags.push(format!("{type_norm}s"));
    }

    tags.join(", ")
}

/// Decide the remote type and formatted value for a metafield.
///
/// Dimension-like keys become `number_decimal` (decimal comma accepted, 0.0
/// on garbage); everything else is a single-line text field.
pub fn metafield_type(key: &str, value: &str) -> (&'static str, String) {
    let lowered = key.to_lowercase();
    if DECIMAL_METAFIELDS.iter().any(|field| lowered.contains(field)) {
        let parsed = value.replace(',', ".").trim().parse::<f64>().unwrap_or(0.0);
        // Whole numbers keep a trailing .0 so the wire value is always a
        // decimal literal.
        let formatted = if parsed.fract() == 0.0 {
            format!("{parsed:.1}")
        } else {
            parsed.to_string()
        };
        ("number_decimal", formatted)
    } else {
        ("single_line_text_field", value.trim().to_string())
    }
}

/// Clean an image URL: scheme prefix, encoded spaces, and a rejection of
/// anything still carrying characters Shopify refuses.
pub fn sanitize_image_src(src: &str) -> Option<String> {
    let mut src = src.trim().to_string();
    if src.is_empty() {
        return None;
    }
    if !src.starts_with("http://") && !src.starts_with("https://") {
        src = format!("https://{src}");
    }
    src = src.replace(' ', "%20");
    if src.contains(['<', '>', '"', '\'']) {
        return None;
    }
    Some(src)
}

/// Up to three `IMAGEN n` columns become positioned images.
pub fn prepare_images(row: &RawRow) -> Vec<NewImage> {
    let description = row.value("DESCRIPCION");
    let mut images = Vec::new();
    for position in 1..=3 {
        let raw = row.value(&format!("IMAGEN {position}"));
        if let Some(src) = sanitize_image_src(&raw) {
            images.push(NewImage {
                src,
                position,
                alt: format!("{description} - Imagen {position}"),
            });
        }
    }
    images
}

fn metafield_if_present(key: &str, value: &str) -> Option<NewMetafield> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (value_type, formatted) = metafield_type(key, trimmed);
    Some(NewMetafield::new(key, formatted, value_type))
}

/// Prepare the product-level data shared by simple and variant products.
pub fn prepare_product(group: &ProductGroup, price_multiplier: f64) -> PreparedProduct {
    let row = &group.base_data;
    let description = row.value("DESCRIPCION");
    let cost = parse_price(&row.value("PRECIO"));

    let mut metafields = Vec::new();
    for (key, value) in [
        ("destinatario", capitalize(&row.value("GENERO"))),
        ("cierre", capitalize(&row.value("CIERRE"))),
        ("material", material_from_description(&description)),
        ("color_del_oro", capitalize(&row.value("COLOR ORO"))),
    ] {
        if let Some(metafield) = metafield_if_present(key, &value) {
            metafields.push(metafield);
        }
    }

    PreparedProduct {
        title: format_title(&group.base_reference, &description),
        body_html: description,
        product_type: capitalize(&row.value("TIPO")),
        tags: process_tags(
            &row.value("CATEGORIA"),
            &row.value("SUBCATEGORIA"),
            &row.value("TIPO"),
        ),
        sku: group.base_reference.clone(),
        price: round2(cost * price_multiplier),
        stock: parse_stock(&row.value("STOCK")),
        grams: parse_grams(&row.value("PESO G.")),
        cost,
        metafields,
        images: prepare_images(row),
    }
}

/// Prepare the per-size variant data; rows without a size suffix are skipped.
pub fn prepare_variants(rows: &[RawRow], price_multiplier: f64) -> Vec<PreparedVariant> {
    rows.iter()
        .filter_map(|row| {
            let sku = row.value(REFERENCE_COLUMN);
            let size = variant_size(&sku)?.to_string();
            let cost = parse_price(&row.value("PRECIO"));
            Some(PreparedVariant {
                size,
                price: round2(cost * price_multiplier),
                sku,
                stock: parse_stock(&row.value("STOCK")),
                grams: parse_grams(&row.value("PESO G.")),
                cost,
            })
        })
        .collect()
}

/// Sorted distinct sizes for the product's single size option.
pub fn distinct_sizes(variants: &[PreparedVariant]) -> Vec<String> {
    let mut sizes: Vec<String> = variants.iter().map(|v| v.size.clone()).collect();
    sizes.sort();
    sizes.dedup();
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::group_rows;

    fn catalog_row(reference: &str, price: &str) -> RawRow {
        RawRow::from([
            ("REFERENCIA", reference),
            ("DESCRIPCION", "18K anillo oro amarillo"),
            ("PRECIO", price),
            ("STOCK", "3"),
            ("TIPO", "solitario"),
            ("CATEGORIA", "Anillos"),
            ("PESO G.", "2,5"),
        ])
    }

    #[test]
    fn title_strips_karat_prefix() {
        assert_eq!(
            format_title("ABC", "18K Anillo oro"),
            "ABC - Anillo oro"
        );
        assert_eq!(format_title("ABC", "pendiente"), "ABC - Pendiente");
        assert_eq!(format_title("ABC", ""), "ABC");
    }

    #[test]
    fn tags_pluralize_known_types() {
        assert_eq!(
            process_tags("Anillos", "Oro", "solitario"),
            "Anillos, Oro, Solitarios"
        );
        assert_eq!(process_tags("", "", "pendiente"), "");
    }

    #[test]
    fn material_detected_from_prefix() {
        assert_eq!(material_from_description("18K anillo"), "Oro 18 kilates");
        assert_eq!(material_from_description("9k aros"), "Oro 9 kilates");
        assert_eq!(material_from_description("plata"), "");
    }

    #[test]
    fn metafield_typing_splits_decimal_and_text() {
        assert_eq!(metafield_type("alto", "1,5"), ("number_decimal", "1.5".into()));
        assert_eq!(metafield_type("alto", "2"), ("number_decimal", "2.0".into()));
        assert_eq!(metafield_type("alto", "n/a"), ("number_decimal", "0.0".into()));
        assert_eq!(
            metafield_type("cierre", " presión "),
            ("single_line_text_field", "presión".into())
        );
    }

    #[test]
    fn image_src_sanitized() {
        assert_eq!(
            sanitize_image_src("cdn.example.com/a b.jpg"),
            Some("https://cdn.example.com/a%20b.jpg".into())
        );
        assert_eq!(sanitize_image_src("https://x/\"bad\".jpg"), None);
        assert_eq!(sanitize_image_src("  "), None);
    }

    #[test]
    fn prepared_product_applies_multiplier() {
        let groups = group_rows(&[catalog_row("ABC", "100")]);
        let prepared = prepare_product(&groups[0], 2.2);
        assert_eq!(prepared.price, 220.0);
        assert_eq!(prepared.cost, 100.0);
        assert_eq!(prepared.sku, "ABC");
        assert_eq!(prepared.product_type, "Solitario");
        assert_eq!(prepared.grams, 2);
        assert!(prepared.metafields.iter().any(|m| m.key == "material"));
    }

    #[test]
    fn variant_sizes_sorted_and_distinct() {
        let rows = vec![catalog_row("ABC/M", "10"), catalog_row("ABC/S", "10")];
        let variants = prepare_variants(&rows, 2.0);
        assert_eq!(variants.len(), 2);
        assert_eq!(distinct_sizes(&variants), vec!["M", "S"]);
        assert_eq!(variants[0].price, 20.0);
    }
}
