//! Parsers des fichiers d'entrée (tableau, codes, palette, limites)

pub mod boundary;
pub mod codes;
pub mod palette;
pub mod table;

use std::borrow::Cow;

/// Décode un fichier texte : UTF-8 si valide, sinon Windows-1252.
///
/// Le BOM UTF-8 éventuel est retiré.
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    match simdutf8::basic::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(data);
            decoded
        }
    }
}

/// Découpe une ligne sur un séparateur ASCII (recherche SIMD via memchr)
pub(crate) fn split_fields(line: &str, delimiter: u8) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(8);
    let mut start = 0;
    for pos in memchr::memchr_iter(delimiter, bytes) {
        fields.push(&line[start..pos]);
        start = pos + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Nettoie un champ : espaces et guillemets englobants
#[inline]
pub(crate) fn clean_field(field: &str) -> &str {
    let trimmed = field.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Parse f64 via fast-float ; les valeurs non finies sont rejetées
#[inline]
pub(crate) fn parse_f64(s: &str) -> Option<f64> {
    let value: f64 = fast_float::parse(s.trim()).ok()?;
    value.is_finite().then_some(value)
}

/// Parse un entier écrit éventuellement en décimal ("3", "3.0")
#[inline]
pub(crate) fn parse_integral(s: &str, max: f64) -> Option<f64> {
    let value = parse_f64(s)?;
    (value.fract() == 0.0 && (0.0..=max).contains(&value)).then_some(value)
}
