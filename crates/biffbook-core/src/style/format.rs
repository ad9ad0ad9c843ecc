//! Number format table

use std::collections::BTreeMap;

use crate::FIRST_USER_FORMAT;

/// Built-in format strings by id; `None` marks ids reserved for locales
const BUILTIN_FORMATS: [Option<&str>; 50] = [
    Some("General"),
    Some("0"),
    Some("0.00"),
    Some("#,##0"),
    Some("#,##0.00"),
    Some("\"$\"#,##0_);(\"$\"#,##0)"),
    Some("\"$\"#,##0_);[Red](\"$\"#,##0)"),
    Some("\"$\"#,##0.00_);(\"$\"#,##0.00)"),
    Some("\"$\"#,##0.00_);[Red](\"$\"#,##0.00)"),
    Some("0%"),
    Some("0.00%"),
    Some("0.00E+00"),
    Some("# ?/?"),
    Some("# ??/??"),
    Some("m/d/yy"),
    Some("d-mmm-yy"),
    Some("d-mmm"),
    Some("mmm-yy"),
    Some("h:mm AM/PM"),
    Some("h:mm:ss AM/PM"),
    Some("h:mm"),
    Some("h:mm:ss"),
    Some("m/d/yy h:mm"),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    Some("#,##0_);(#,##0)"),
    Some("#,##0_);[Red](#,##0)"),
    Some("#,##0.00_);(#,##0.00)"),
    Some("#,##0.00_);[Red](#,##0.00)"),
    Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
    Some("_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)"),
    Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
    Some("_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)"),
    Some("mm:ss"),
    Some("[h]:mm:ss"),
    Some("mm:ss.0"),
    Some("##0.0E+0"),
    Some("@"),
];

/// Format string of a built-in format id
pub fn builtin_format(id: u16) -> Option<&'static str> {
    BUILTIN_FORMATS.get(id as usize).copied().flatten()
}

/// Built-in formats plus the workbook's custom FORMAT entries
#[derive(Debug, Clone, Default)]
pub struct FormatTable {
    custom: BTreeMap<u16, String>,
}

impl FormatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `code`, adding a custom format if no entry matches
    pub fn get_or_add(&mut self, code: &str) -> u16 {
        if let Some(id) = self.find(code) {
            return id;
        }
        let id = self
            .custom
            .keys()
            .next_back()
            .map_or(FIRST_USER_FORMAT, |last| (last + 1).max(FIRST_USER_FORMAT));
        self.custom.insert(id, code.to_string());
        id
    }

    /// Register a custom format at a known id, replacing any previous entry
    pub fn insert(&mut self, id: u16, code: impl Into<String>) {
        self.custom.insert(id, code.into());
    }

    /// Id of an existing format with this exact code
    pub fn find(&self, code: &str) -> Option<u16> {
        if let Some(id) = self
            .custom
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .map(|(id, _)| *id)
        {
            return Some(id);
        }
        (0..BUILTIN_FORMATS.len() as u16).find(|&id| builtin_format(id) == Some(code))
    }

    /// Format string for an id; custom entries take precedence
    pub fn format_string(&self, id: u16) -> Option<&str> {
        self.custom
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))
    }

    pub fn custom_formats(&self) -> impl Iterator<Item = (u16, &str)> {
        self.custom.iter().map(|(id, c)| (*id, c.as_str()))
    }

    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let table = FormatTable::new();
        assert_eq!(table.format_string(0), Some("General"));
        assert_eq!(table.format_string(14), Some("m/d/yy"));
        assert_eq!(table.format_string(30), None);
        assert_eq!(table.format_string(49), Some("@"));
    }

    #[test]
    fn test_custom_formats_start_at_first_user_id() {
        let mut table = FormatTable::new();
        assert_eq!(table.get_or_add("0.00%"), 10);
        let a = table.get_or_add("yyyy-mm-dd");
        let b = table.get_or_add("0.000");
        assert_eq!(a, FIRST_USER_FORMAT);
        assert_eq!(b, FIRST_USER_FORMAT + 1);
        assert_eq!(table.get_or_add("yyyy-mm-dd"), a);
        assert_eq!(table.format_string(b), Some("0.000"));
    }
}
