//! Name casing helpers for schema, parameter, and path names.
//!
//! All functions are pure and stateless; they are cheap enough to call
//! wherever a name is needed.

use convert_case::{Case, Casing};

/// `blog_post` -> `BlogPost`.
pub fn pascal(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// `BlogPost` -> `blogPost`.
pub fn camel(name: &str) -> String {
    name.to_case(Case::Camel)
}

/// `BlogPost` -> `blog-post`.
pub fn kebab(name: &str) -> String {
    name.to_case(Case::Kebab)
}

/// Pluralize the final word of a name.
///
/// Intentionally small rule set: sibilant endings get `es`,
/// consonant + `y` becomes `ies`, everything else gets `s`.
pub fn plural(name: &str) -> String {
    if ends_with_sibilant(name) {
        return format!("{name}es");
    }
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.ends_with(is_vowel) && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    format!("{name}s")
}

/// Singularize the final word of a name. Inverse of [`plural`] for the
/// same rule set; names that do not look plural pass through unchanged.
pub fn singular(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = name.strip_suffix("es") {
        if ends_with_sibilant(stem) {
            return stem.to_string();
        }
    }
    if name.ends_with('s') && !name.ends_with("ss") {
        return name[..name.len() - 1].to_string();
    }
    name.to_string()
}

fn ends_with_sibilant(name: &str) -> bool {
    name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}
