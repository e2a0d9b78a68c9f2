use mconnect_shared::Department;

/// Case-insensitive, whitespace-trimmed department name equality.
pub fn names_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// The department of `catalog` named like the home department. First match
/// wins.
pub fn match_department<'a>(home_name: &str, catalog: &'a [Department]) -> Option<&'a Department> {
    catalog.iter().find(|d| names_match(home_name, &d.name))
}
