//! Printing helpers shared by the commands.

use anyhow::Result;
use jobcache_core::utils::{format_optional, truncate_string};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One `label: value` line, with `-` for missing values.
pub fn field(label: &str, value: Option<&str>) {
    println!("{:<14} {}", format!("{}:", label), format_optional(value, "-"));
}

/// Fixed-width table row; cells longer than their width are cut.
pub fn row(cells: &[(&str, usize)]) -> String {
    cells
        .iter()
        .map(|(text, width)| format!("{:<width$}", truncate_string(text, *width), width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row() {
        assert_eq!(row(&[("id", 4), ("Senior Rust Engineer", 10)]), "id    Senior ...");
        assert_eq!(row(&[("a", 3), ("", 3)]), "a");
    }
}
