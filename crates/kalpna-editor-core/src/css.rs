//! Inline `style` attribute declarations.

/// Split a `style` attribute into `(name, value)` pairs.
///
/// Names are lowercased; declarations without a colon or with an empty name
/// are skipped.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim().to_string()))
        })
        .collect()
}

/// Join declarations the way browsers serialize `element.style`:
/// `name: value;` separated by single spaces.
pub fn serialize_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}
