//! A formula engine that keeps formulas as text
//!
//! Tokens are the normalized formula text stored in a slab. Row shifts are
//! applied by rewriting A1-style references found outside string literals.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{FormulaEngine, FormulaHost, RowShift, TokenHandle};
use crate::cell::{CellAddress, CellError, CellRange};
use crate::error::{Error, Result};
use crate::MAX_ROWS;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<sheet>(?:'(?:[^']|'')+'|[A-Za-z_][A-Za-z0-9_.]*)!)?(?P<a>\$?[A-Za-z]{1,3}\$?[0-9]+)(?::(?P<b>\$?[A-Za-z]{1,3}\$?[0-9]+))?",
    )
    .expect("reference pattern is valid")
});

/// Slab-backed [`FormulaEngine`] storing formula text
#[derive(Debug, Default)]
pub struct TextFormulaEngine {
    slots: Vec<Option<String>>,
    free: Vec<u32>,
}

impl TextFormulaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of token sets currently alive
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn slot(&self, tokens: TokenHandle) -> Result<&String> {
        self.slots
            .get(tokens.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::FormulaParse(format!("stale formula handle {}", tokens.0)))
    }
}

impl FormulaEngine for TextFormulaEngine {
    fn parse(&mut self, text: &str) -> Result<TokenHandle> {
        let body = text.trim();
        let body = body.strip_prefix('=').unwrap_or(body).trim();
        validate(body)?;

        let text = body.to_string();
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(text);
                id
            }
            None => {
                self.slots.push(Some(text));
                (self.slots.len() - 1) as u32
            }
        };
        Ok(TokenHandle(id))
    }

    fn to_text(&self, tokens: TokenHandle) -> Result<String> {
        self.slot(tokens).cloned()
    }

    fn formula_changing(&mut self, tokens: TokenHandle) {
        if let Some(slot) = self.slots.get_mut(tokens.0 as usize) {
            if slot.take().is_some() {
                self.free.push(tokens.0);
            }
        }
    }

    fn adjust_row_shift(
        &mut self,
        host: FormulaHost,
        tokens: &[TokenHandle],
        shift: &RowShift<'_>,
    ) -> usize {
        let host_sheet = match host {
            FormulaHost::Sheet(i) => Some(i),
            FormulaHost::Workbook => None,
        };
        let mut changed = 0;
        for handle in tokens {
            let Some(Some(text)) = self.slots.get_mut(handle.0 as usize) else {
                continue;
            };
            if let Some(rewritten) = shift_formula_text(text, host_sheet, shift) {
                log::trace!("formula {} rewritten: {} -> {}", handle.0, text, rewritten);
                *text = rewritten;
                changed += 1;
            }
        }
        changed
    }
}

fn validate(body: &str) -> Result<()> {
    if body.is_empty() {
        return Err(Error::FormulaParse("empty formula".into()));
    }
    let mut depth = 0i32;
    let mut in_string = false;
    for c in body.chars() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::FormulaParse(format!("unbalanced ')' in '{body}'")));
                }
            }
            _ => {}
        }
    }
    if in_string {
        return Err(Error::FormulaParse(format!("unterminated string in '{body}'")));
    }
    if depth != 0 {
        return Err(Error::FormulaParse(format!("unbalanced '(' in '{body}'")));
    }
    Ok(())
}

/// Rewrite the references in `text` affected by `shift`
///
/// `host_sheet` is the sheet unqualified references resolve against; `None`
/// for workbook-level names, where only sheet-qualified references count.
/// Returns `None` when nothing changed.
pub fn shift_formula_text(text: &str, host_sheet: Option<usize>, shift: &RowShift<'_>) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    for (i, segment) in text.split('"').enumerate() {
        if i > 0 {
            out.push('"');
        }
        if i % 2 == 1 {
            out.push_str(segment);
            continue;
        }
        match rewrite_segment(segment, host_sheet, shift) {
            Some(s) => {
                changed = true;
                out.push_str(&s);
            }
            None => out.push_str(segment),
        }
    }
    changed.then_some(out)
}

fn rewrite_segment(segment: &str, host_sheet: Option<usize>, shift: &RowShift<'_>) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;
    let mut changed = false;

    for caps in REFERENCE.captures_iter(segment) {
        let Some(whole) = caps.get(0) else { continue };
        if !is_standalone(segment, whole.start(), whole.end()) {
            continue;
        }
        let Some(replacement) = rewrite_reference(&caps, host_sheet, shift) else {
            continue;
        };
        out.push_str(&segment[last..whole.start()]);
        out.push_str(&replacement);
        last = whole.end();
        changed = true;
    }

    if !changed {
        return None;
    }
    out.push_str(&segment[last..]);
    Some(out)
}

/// Rejects matches that are really part of an identifier or a function call
fn is_standalone(segment: &str, start: usize, end: usize) -> bool {
    let before = segment[..start].chars().next_back();
    let after = segment[end..].chars().next();
    let ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$';
    !before.is_some_and(|c| ident(c) || c == '\'')
        && !after.is_some_and(|c| ident(c) || c == '(' || c == '!')
}

fn targets_shifted_sheet(sheet: Option<&str>, host_sheet: Option<usize>, shift: &RowShift<'_>) -> bool {
    match sheet {
        Some(prefix) => {
            let name = prefix.trim_end_matches('!');
            let name = name
                .strip_prefix('\'')
                .and_then(|n| n.strip_suffix('\''))
                .map(|n| n.replace("''", "'"))
                .unwrap_or_else(|| name.to_string());
            name.eq_ignore_ascii_case(shift.sheet_name())
        }
        None => host_sheet == Some(shift.sheet),
    }
}

fn rewrite_reference(caps: &Captures<'_>, host_sheet: Option<usize>, shift: &RowShift<'_>) -> Option<String> {
    let sheet = caps.name("sheet").map(|m| m.as_str());
    if !targets_shifted_sheet(sheet, host_sheet, shift) {
        return None;
    }
    let a = CellAddress::parse(caps.name("a")?.as_str()).ok()?;
    let prefix = sheet.unwrap_or_default();
    let invalid = || Some(CellError::Ref.as_str().to_string());

    match caps.name("b") {
        None => {
            if shift.moves_row(a.row) {
                match moved_row(a.row, shift) {
                    Some(row) => Some(format!("{prefix}{}", CellAddress { row, ..a })),
                    None => invalid(),
                }
            } else if shift.overwrites_row(a.row) {
                invalid()
            } else {
                None
            }
        }
        Some(b) => {
            let b = CellAddress::parse(b.as_str()).ok()?;
            let a_moves = shift.moves_row(a.row);
            let b_moves = shift.moves_row(b.row);
            if !a_moves && !b_moves {
                if shift.overwrites_row(a.row.min(b.row)) && shift.overwrites_row(a.row.max(b.row)) {
                    return invalid();
                }
                return None;
            }
            let new_a = if a_moves { moved_row(a.row, shift) } else { Some(a.row) };
            let new_b = if b_moves { moved_row(b.row, shift) } else { Some(b.row) };
            let (Some(ra), Some(rb)) = (new_a, new_b) else {
                return invalid();
            };
            let area = CellRange::new(CellAddress { row: ra, ..a }, CellAddress { row: rb, ..b });
            Some(format!("{prefix}{}:{}", area.start, area.end))
        }
    }
}

fn moved_row(row: u32, shift: &RowShift<'_>) -> Option<u32> {
    let moved = row as i64 + shift.delta;
    (0..MAX_ROWS as i64).contains(&moved).then_some(moved as u32)
}
