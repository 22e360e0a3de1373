//! Rendering accumulated items: TSV export and the terminal table.
//!
//! The TSV layout is meant to be pasted straight into a spreadsheet: one
//! header row, one row per item, raw numbers, no summary row. The table is
//! for reading: amounts are formatted as CNY and a Grand Total closes it.

use crate::error::InvoiceError;
use crate::output::InvoiceItem;
use std::io::Write;
use std::path::Path;
use tracing::info;
use unicode_width::UnicodeWidthStr;

pub const TSV_HEADER: &str = "分类\t名称\t数量\t单价\t总金额\t备注";

pub const DEFAULT_TITLE: &str = "学生会大团建物口清单 (Student Union Item List)";

pub const VERIFY_NOTICE: &str = "This list is generated by AI. Please verify all quantities and prices against the original document before processing payments.";

/// Header row plus one line per item, `\n`-separated, no trailing newline.
pub fn to_tsv(items: &[InvoiceItem]) -> String {
    let mut out = String::from(TSV_HEADER);
    for item in items {
        out.push('\n');
        let row = [
            tsv_field(item.category.label()),
            tsv_field(&item.name),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total_amount.to_string(),
            tsv_field(&item.remarks),
        ];
        out.push_str(&row.join("\t"));
    }
    out
}

// Tabs and newlines would shift columns in the pasted sheet.
fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\r', '\n'], " ")
}

/// Write the TSV export via a temp file in the same directory, then rename.
pub fn write_tsv(path: &Path, items: &[InvoiceItem]) -> Result<(), InvoiceError> {
    let write_err = |source: std::io::Error| InvoiceError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(to_tsv(items).as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} item(s) to {}", items.len(), path.display());
    Ok(())
}

/// Format an amount as Chinese yuan: `¥1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}¥{}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}

/// The items as an aligned text table with a title and a Grand Total row.
pub fn render_table(title: &str, items: &[InvoiceItem]) -> String {
    let header = ["分类", "名称", "数量", "单价", "总金额", "备注"];
    let mut rows: Vec<[String; 6]> = items
        .iter()
        .map(|item| {
            let category = match item.category.label().trim() {
                "" => "-".to_string(),
                label => label.to_string(),
            };
            [
                category,
                item.name.clone(),
                item.quantity.to_string(),
                format_currency(item.unit_price),
                format_currency(item.total_amount),
                item.remarks.clone(),
            ]
        })
        .collect();

    let grand_total: f64 = items.iter().map(|i| i.total_amount).sum();
    rows.push([
        String::new(),
        String::new(),
        String::new(),
        "Grand Total".to_string(),
        format_currency(grand_total),
        String::new(),
    ]);

    let mut widths = header.map(display_width);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(display_width(cell));
        }
    }

    let rule: String = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format_row(&header.map(String::from), &widths));
    out.push_str(&rule);
    out.push('\n');
    let (body, footer) = rows.split_at(rows.len() - 1);
    for row in body {
        out.push_str(&format_row(row, &widths));
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_row(&footer[0], &widths));
    out
}

fn format_row(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .enumerate()
        .map(|(col, (cell, &w))| {
            let pad = " ".repeat(w - display_width(cell));
            // Numeric columns align right.
            if (2..=4).contains(&col) {
                format!(" {}{} ", pad, cell)
            } else {
                format!(" {}{} ", cell, pad)
            }
        })
        .collect();
    let mut s = line.join("|");
    s.truncate(s.trim_end().len());
    s.push('\n');
    s
}

/// Terminal columns taken by `s`; CJK and emoji count twice.
fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Category;

    fn item(category: Category, name: &str, qty: f64, unit: f64, total: f64) -> InvoiceItem {
        InvoiceItem {
            category,
            name: name.into(),
            quantity: qty,
            unit_price: unit,
            total_amount: total,
            remarks: String::new(),
        }
    }

    #[test]
    fn tsv_has_header_and_raw_numbers() {
        let items = vec![
            item(Category::Refreshments, "receipt-1", 1.0, 88.0, 88.0),
            item(Category::Materials, "receipt-2", 3.0, 4.5, 13.5),
        ];
        let tsv = to_tsv(&items);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], TSV_HEADER);
        assert_eq!(lines[1], "茶歇\treceipt-1\t1\t88\t88\t");
        assert_eq!(lines[2], "物料\treceipt-2\t3\t4.5\t13.5\t");
        assert_eq!(lines.len(), 3);
        assert!(!tsv.ends_with('\n'));
    }

    #[test]
    fn empty_tsv_is_header_only() {
        assert_eq!(to_tsv(&[]), TSV_HEADER);
    }

    #[test]
    fn tsv_fields_never_contain_tabs() {
        let items = vec![item(Category::Other("a\tb".into()), "x\ny", 1.0, 1.0, 1.0)];
        let tsv = to_tsv(&items);
        assert_eq!(tsv.lines().nth(1).unwrap(), "a b\tx y\t1\t1\t1\t");
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(0.0), "¥0.00");
        assert_eq!(format_currency(88.0), "¥88.00");
        assert_eq!(format_currency(1234.5), "¥1,234.50");
        assert_eq!(format_currency(1234567.891), "¥1,234,567.89");
        assert_eq!(format_currency(-12.3), "-¥12.30");
    }

    #[test]
    fn table_has_title_total_and_placeholder_category() {
        let items = vec![
            item(Category::Other(String::new()), "a", 1.0, 10.0, 10.0),
            item(Category::Materials, "b", 2.0, 1000.0, 2000.0),
        ];
        let table = render_table(DEFAULT_TITLE, &items);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], DEFAULT_TITLE);
        assert!(lines[3].trim_start().starts_with('-'), "got: {}", lines[3]);
        assert!(lines[4].contains("物料"));
        let last = lines.last().unwrap();
        assert!(last.contains("Grand Total"));
        assert!(last.contains("¥2,010.00"));
    }

    #[test]
    fn wide_characters_count_double() {
        assert_eq!(display_width("分类"), 4);
        assert_eq!(display_width("ab"), 2);
        assert_eq!(display_width("¥1"), 2);
        assert_eq!(display_width("🧾"), 2);
        assert_eq!(display_width("🍱 lunch"), 8);
    }

    #[test]
    fn emoji_rows_stay_aligned() {
        let items = vec![
            item(Category::Refreshments, "🍱", 1.0, 35.0, 35.0),
            item(Category::Materials, "ab", 1.0, 2.0, 2.0),
        ];
        let table = render_table("t", &items);
        let lines: Vec<&str> = table.lines().collect();
        let second_bar = |l: &str| {
            let idx = l.match_indices('|').nth(1).unwrap().0;
            display_width(&l[..idx])
        };
        assert_eq!(second_bar(lines[3]), second_bar(lines[4]));
    }

    #[test]
    fn write_tsv_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("items.tsv");
        let items = vec![item(Category::Materials, "r", 1.0, 2.0, 2.0)];

        write_tsv(&path, &items).unwrap();
        write_tsv(&path, &items).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, to_tsv(&items));
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
