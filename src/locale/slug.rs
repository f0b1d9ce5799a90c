//! Locale-suffixed slug derivation.
//!
//! Product slugs carry their locale as a trailing segment (`dragon-deck-en`). These
//! helpers are pure and total: every input, including a missing slug, maps to a slug.

use crate::model::Locale;

const PLACEHOLDER: &str = "product";

/// The locale a slug ends in, if its last `-` segment is a known locale code.
///
/// Only 2–3 letter segments are considered, so `red-box` or `deck-2024` are left alone.
pub fn locale_suffix(slug: &str) -> Option<Locale> {
    let (_, suffix) = slug.rsplit_once('-')?;
    if !(2..=3).contains(&suffix.len()) || !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Locale::from_code(suffix)
}

/// `slug` without its locale suffix. Slugs without one are returned unchanged.
pub fn strip_locale_suffix(slug: &str) -> &str {
    match locale_suffix(slug) {
        Some(_) => slug.rsplit_once('-').map_or(slug, |(base, _)| base),
        None => slug,
    }
}

/// Derives the slug of the `locale` variant of `slug`.
///
/// A recognized suffix is replaced, otherwise `locale` is appended. A missing or empty
/// slug yields `<fallback>-<locale>`, with `product` standing in for a missing fallback.
///
/// ```
/// use catalog_sync::locale::compute_variant_slug;
/// use catalog_sync::model::Locale;
///
/// assert_eq!(compute_variant_slug(Some("dragon-deck-en"), Locale::Fr, None), "dragon-deck-fr");
/// assert_eq!(compute_variant_slug(None, Locale::Fr, Some("fallback")), "fallback-fr");
/// ```
pub fn compute_variant_slug(slug: Option<&str>, locale: Locale, fallback: Option<&str>) -> String {
    let base = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => strip_locale_suffix(slug),
        None => fallback
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(PLACEHOLDER),
    };
    format!("{base}-{}", locale.code())
}
