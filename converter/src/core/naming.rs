//! Output file naming for converted sources.

use std::path::Path;

use crate::core::types::FileKind;

/// Java class name from a C base name: split on `_`, capitalize each word.
///
/// Capitalizing lowercases the rest of each word, so `CUST_info` becomes
/// `CustInfo`.
pub fn java_class_name(base_name: &str) -> String {
    base_name.split('_').map(capitalize).collect()
}

/// File name written for a converted input.
pub fn output_file_name(input: &Path, kind: FileKind) -> String {
    let base = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match kind {
        FileKind::Dbio => format!("{base}Mapper.xml"),
        FileKind::C => format!("{}.java", java_class_name(&base)),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_name_capitalizes_each_segment() {
        assert_eq!(java_class_name("customer_service"), "CustomerService");
        assert_eq!(java_class_name("CUST_info"), "CustInfo");
        assert_eq!(java_class_name("a__b"), "AB");
    }

    #[test]
    fn output_names_follow_file_kind() {
        assert_eq!(
            output_file_name(Path::new("src/customer_service.c"), FileKind::C),
            "CustomerService.java"
        );
        assert_eq!(
            output_file_name(Path::new("db/cust_dbio.c"), FileKind::Dbio),
            "cust_dbioMapper.xml"
        );
    }
}
