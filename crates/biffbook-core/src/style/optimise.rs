//! Deduplication passes over the style and font tables
//!
//! Both passes share one shape: map every entry to the first earlier entry it
//! equals, drop duplicates and unused entries above the built-in range, then
//! rewrite every reference through `index -> canonical -> final position`.

use ahash::AHashSet;

use super::{FontTable, StyleTable};
use crate::cell::CellRecord;
use crate::strings::SharedStringTable;
use crate::worksheet::Worksheet;
use crate::{FIRST_USER_FONT, FIRST_USER_STYLE};

/// Result of planning a dedup pass over `n` entries
struct Plan {
    /// Final index for every original index
    remap: Vec<u16>,
    /// Indices to remove, highest first
    removed: Vec<u16>,
}

/// First earlier equal entry for each index at or above `first_user`
fn canonical_indices<T: PartialEq>(entries: &[T], first_user: usize) -> Vec<usize> {
    let mut canonical: Vec<usize> = (0..entries.len()).collect();
    for i in first_user..entries.len() {
        if let Some(j) = (0..i).find(|&j| entries[j] == entries[i]) {
            canonical[i] = j;
        }
    }
    canonical
}

fn plan(canonical: &[usize], used: &[bool], first_user: usize) -> Plan {
    let n = canonical.len();
    let remove: Vec<bool> = (0..n)
        .map(|i| i >= first_user && (canonical[i] != i || !used[i]))
        .collect();

    let mut new_pos = vec![0u16; n];
    let mut removed_before = 0u16;
    for i in 0..n {
        if remove[i] {
            removed_before += 1;
        } else {
            new_pos[i] = i as u16 - removed_before;
        }
    }

    let remap = (0..n)
        .map(|i| {
            let c = canonical[i];
            if remove[c] {
                0
            } else {
                new_pos[c]
            }
        })
        .collect();
    let removed = (0..n).rev().filter(|&i| remove[i]).map(|i| i as u16).collect();
    Plan { remap, removed }
}

/// Reference counts of every style index across cells and rows
pub(crate) fn style_usage(style_count: usize, sheets: &[Worksheet]) -> Vec<usize> {
    let mut usage = vec![0usize; style_count];
    for sheet in sheets {
        for row in sheet.rows() {
            if let Some(slot) = row.style_index.and_then(|s| usage.get_mut(s as usize)) {
                *slot += 1;
            }
            for (_, record) in row.cells() {
                if let Some(slot) = usage.get_mut(record.xf_index() as usize) {
                    *slot += 1;
                }
            }
        }
    }
    usage
}

/// Merge equal styles and drop unused user styles; returns how many were removed
pub(crate) fn optimise_styles(styles: &mut StyleTable, sheets: &mut [Worksheet]) -> usize {
    let first = FIRST_USER_STYLE as usize;
    let n = styles.len();
    let canonical = canonical_indices(styles.entries(), first);

    let mut used = vec![false; n];
    for (i, count) in style_usage(n, sheets).into_iter().enumerate() {
        if count > 0 {
            used[canonical[i]] = true;
        }
    }
    for (i, xf) in styles.entries().iter().enumerate() {
        if xf.is_named() {
            used[canonical[i]] = true;
        }
    }
    // Parents of anything kept are kept too
    let mut pending: Vec<usize> = (0..n).filter(|&i| used[i]).collect();
    while let Some(i) = pending.pop() {
        if let Some(p) = styles.entries()[i].parent.map(|p| p as usize) {
            if p < n && !used[canonical[p]] {
                used[canonical[p]] = true;
                pending.push(canonical[p]);
            }
        }
    }

    let plan = plan(&canonical, &used, first);
    if plan.removed.is_empty() {
        log::debug!("optimise_styles: {n} styles, nothing to remove");
        return 0;
    }

    styles.remove_sorted_desc(&plan.removed);
    let remap = |i: u16| -> u16 {
        let mapped = plan.remap.get(i as usize).copied().unwrap_or(0);
        debug_assert!((mapped as usize) < n - plan.removed.len(), "style remap out of range");
        mapped
    };
    for xf in styles.entries_mut() {
        xf.parent = xf.parent.map(remap);
    }
    for sheet in sheets.iter_mut() {
        for row in sheet.rows_mut() {
            row.style_index = row.style_index.map(remap);
            for (_, record) in row.cells_mut() {
                let header = record.header_mut();
                header.xf_index = remap(header.xf_index);
            }
        }
    }

    log::debug!(
        "optimise_styles: removed {} of {n} styles",
        plan.removed.len()
    );
    plan.removed.len()
}

/// Merge equal fonts and drop unused user fonts; returns how many were removed
pub(crate) fn optimise_fonts(
    fonts: &mut FontTable,
    styles: &mut StyleTable,
    strings: &mut SharedStringTable,
    sheets: &[Worksheet],
) -> usize {
    let first = FIRST_USER_FONT as usize;
    let n = fonts.len();
    let canonical = canonical_indices(fonts.entries(), first);

    let mut used = vec![false; n];
    let mut mark = |f: u16| {
        if let Some(&c) = canonical.get(f as usize) {
            used[c] = true;
        }
    };
    for (_, xf) in styles.iter() {
        if let Some(f) = xf.font_index {
            mark(f);
        }
    }
    for (_, s) in strings.iter() {
        for run in s.runs() {
            mark(run.font_index);
        }
    }

    let plan = plan(&canonical, &used, first);
    if plan.removed.is_empty() {
        log::debug!("optimise_fonts: {n} fonts, nothing to remove");
        return 0;
    }

    fonts.remove_sorted_desc(&plan.removed);
    let remap = |i: u16| -> u16 { plan.remap.get(i as usize).copied().unwrap_or(0) };
    for xf in styles.entries_mut() {
        xf.font_index = xf.font_index.map(remap);
    }

    // Strings reached through cells first, then whatever else the pool holds;
    // each entry is rewritten once however many cells share it
    let mut done = AHashSet::new();
    for sheet in sheets {
        for row in sheet.rows() {
            for (_, record) in row.cells() {
                if let CellRecord::LabelSst(label) = record {
                    if done.insert(label.sst_index) {
                        strings.remap_runs(label.sst_index, remap);
                    }
                }
            }
        }
    }
    for index in 0..strings.len() as u32 {
        if done.insert(index) {
            strings.remap_runs(index, remap);
        }
    }

    log::debug!(
        "optimise_fonts: removed {} of {n} fonts, {} strings rewritten",
        plan.removed.len(),
        done.len()
    );
    plan.removed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::{FormatRun, UnicodeString};
    use crate::style::{ExtendedFormat, Font};
    use crate::Workbook;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_composes_canonical_and_position() {
        // 0,1 built in; 2 unique used; 3 duplicate of 2; 4 unused; 5 unique used
        let canonical = vec![0, 1, 2, 2, 4, 5];
        let used = vec![true, true, true, false, false, true];
        let plan = plan(&canonical, &used, 2);
        assert_eq!(plan.removed, vec![4, 3]);
        assert_eq!(plan.remap, vec![0, 1, 2, 2, 0, 3]);
    }

    #[test]
    fn test_canonical_picks_first_match() {
        let entries = ["a", "b", "a", "b", "a"];
        assert_eq!(canonical_indices(&entries, 2), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_font_dedup_rewrites_styles_and_runs() {
        let mut wb = Workbook::new();
        let large = Font::new().with_points(14);
        assert_eq!(wb.add_font(large.clone()), 4);
        assert_eq!(wb.add_font(large), 5);
        assert_eq!(wb.add_font(Font::new().with_name("Courier New")), 6);
        assert_eq!(wb.add_font(Font::new().with_name("Georgia")), 7);

        let style = wb.add_style(ExtendedFormat::child_of(0).with_font(5)).unwrap();
        wb.cell_mut(0, 0, 0).unwrap().set_style(style).unwrap();
        let rich = UnicodeString::with_runs("abc", vec![FormatRun::new(0, 7), FormatRun::new(1, 5)]);
        wb.cell_mut(0, 1, 0).unwrap().set_rich_string(rich.clone()).unwrap();
        wb.cell_mut(0, 2, 0).unwrap().set_rich_string(rich).unwrap();
        assert_eq!(wb.shared_strings().len(), 1);

        assert_eq!(wb.optimise_fonts(), 2);
        assert_eq!(wb.fonts().len(), 6);
        assert_eq!(wb.styles().get(style.index()).unwrap().font_index, Some(4));
        for row in [1, 2] {
            let text = wb.cell(0, row, 0).unwrap().unwrap().rich_string_value().unwrap();
            assert_eq!(text.runs(), &[FormatRun::new(0, 5), FormatRun::new(1, 4)][..]);
        }
    }
}
