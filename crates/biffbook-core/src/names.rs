//! Defined names
//!
//! A defined name binds an identifier to a formula, either for the whole
//! workbook or for one sheet. The formula is held as engine tokens so row
//! shifts can rewrite its references like any cell formula.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use crate::formula::{FormulaHost, TokenHandle};

const MAX_NAME_LEN: usize = 255;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_\\][A-Za-z0-9_.\\]*$").expect("defined name pattern is valid")
});

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Available throughout the workbook (global)
    Workbook,
    /// Scoped to a specific sheet (local)
    Sheet(usize),
}

impl NameScope {
    /// Where the name's formula tokens live
    pub fn host(&self) -> FormulaHost {
        match self {
            NameScope::Workbook => FormulaHost::Workbook,
            NameScope::Sheet(i) => FormulaHost::Sheet(*i),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    /// Names are case-insensitive
    pub name: String,
    pub scope: NameScope,
    pub tokens: TokenHandle,
    /// Optional comment/description for documentation
    pub comment: Option<String>,
    /// Whether this name is hidden from the UI
    pub hidden: bool,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, scope: NameScope, tokens: TokenHandle) -> Self {
        Self {
            name: name.into(),
            scope,
            tokens,
            comment: None,
            hidden: false,
        }
    }
}

/// Check that `name` can be used as a defined name
///
/// Names start with a letter, underscore or backslash, contain no spaces, and
/// must not read as a cell reference such as `AB12`. `R` and `C` alone are
/// reserved for R1C1 notation.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidName(format!(
            "'{name}' must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(Error::InvalidName(format!("'{name}' contains invalid characters")));
    }
    let upper = name.to_ascii_uppercase();
    let looks_like_r1c1 = upper == "R" || upper == "C";
    if looks_like_r1c1 || CellAddress::parse(name).is_ok() {
        return Err(Error::InvalidName(format!("'{name}' looks like a cell reference")));
    }
    Ok(())
}

/// Collection of defined names in definition order
#[derive(Debug, Default, Clone)]
pub struct DefinedNames {
    names: Vec<DefinedName>,
}

impl DefinedNames {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str, scope: NameScope) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n.scope == scope && n.name.eq_ignore_ascii_case(name))
    }

    /// Add a name; fails if the name is invalid or taken in that scope
    pub fn define(&mut self, name: DefinedName) -> Result<()> {
        validate_name(&name.name)?;
        if self.position(&name.name, name.scope).is_some() {
            return Err(Error::InvalidName(format!(
                "'{}' already exists in this scope",
                name.name
            )));
        }
        self.names.push(name);
        Ok(())
    }

    /// Look up a name as seen from `current_sheet`
    ///
    /// A sheet-scoped name shadows a workbook-scoped one.
    pub fn get(&self, name: &str, current_sheet: usize) -> Option<&DefinedName> {
        self.get_exact(name, NameScope::Sheet(current_sheet))
            .or_else(|| self.get_exact(name, NameScope::Workbook))
    }

    pub fn get_exact(&self, name: &str, scope: NameScope) -> Option<&DefinedName> {
        self.position(name, scope).map(|i| &self.names[i])
    }

    pub fn get_exact_mut(&mut self, name: &str, scope: NameScope) -> Option<&mut DefinedName> {
        self.position(name, scope).map(|i| &mut self.names[i])
    }

    /// Detach a name; the caller owns its tokens afterwards
    pub fn remove(&mut self, name: &str, scope: NameScope) -> Option<DefinedName> {
        self.position(name, scope).map(|i| self.names.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefinedName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Tokens of every name hosted by `host`
    pub(crate) fn tokens_for(&self, host: FormulaHost) -> Vec<TokenHandle> {
        self.names
            .iter()
            .filter(|n| n.scope.host() == host)
            .map(|n| n.tokens)
            .collect()
    }

    /// Distinct hosts that own at least one name
    pub(crate) fn hosts(&self) -> Vec<FormulaHost> {
        let mut hosts: Vec<FormulaHost> = Vec::new();
        for n in &self.names {
            let host = n.scope.host();
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        hosts
    }

    /// A sheet was removed: drop its names and renumber later sheets
    pub(crate) fn sheet_removed(&mut self, index: usize) -> Vec<DefinedName> {
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.names)
            .into_iter()
            .partition(|n| n.scope == NameScope::Sheet(index));
        self.names = kept;
        for n in &mut self.names {
            if let NameScope::Sheet(i) = &mut n.scope {
                if *i > index {
                    *i -= 1;
                }
            }
        }
        dropped
    }

    /// A sheet was inserted at `index`
    pub(crate) fn sheet_inserted(&mut self, index: usize) {
        for n in &mut self.names {
            if let NameScope::Sheet(i) = &mut n.scope {
                if *i >= index {
                    *i += 1;
                }
            }
        }
    }

    /// A sheet moved from `from` to `to`
    pub(crate) fn sheet_moved(&mut self, from: usize, to: usize) {
        for n in &mut self.names {
            if let NameScope::Sheet(i) = &mut n.scope {
                *i = moved_position(*i, from, to);
            }
        }
    }
}

/// New position of the sheet at `i` after moving `from` to `to`
pub(crate) fn moved_position(i: usize, from: usize, to: usize) -> usize {
    if i == from {
        to
    } else if from < i && i <= to {
        i - 1
    } else if to <= i && i < from {
        i + 1
    } else {
        i
    }
}
