//! Table detection from word boxes.
//!
//! Ruling lines are not interpreted. A table is a run of at least two
//! adjacent text lines that each split into two or more cells, where cells
//! are separated by a horizontal gap wider than the line's height. Cells are
//! assigned to columns by clustering their left edges across the run.

use serde::Serialize;

use super::layout::{PageWords, Word};

/// Baseline difference under which two words share a line.
const LINE_TOLERANCE: f64 = 3.0;

/// Left edges closer than this belong to one column.
const COLUMN_TOLERANCE: f64 = 6.0;

/// Minimum number of rows for a run of lines to count as a table.
const MIN_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// 1-based.
    pub page: u32,
    /// Position of the table on its page, top to bottom.
    pub table_index: usize,
    /// Cells row by row; `None` where a row has nothing in a column.
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone)]
struct Cell {
    x0: f64,
    x1: f64,
    text: String,
}

#[derive(Debug)]
struct Line {
    top: f64,
    bottom: f64,
    cells: Vec<Cell>,
}

/// Tables on the given 1-based pages, in page order.
pub fn extract_tables(pages: &[PageWords], selected: &[u32]) -> Vec<Table> {
    let _span = tracing::info_span!("pdf.extract_tables", pages = selected.len()).entered();

    selected
        .iter()
        .filter_map(|&number| pages.iter().find(|p| p.page == number))
        .flat_map(|page| {
            page_tables(&page.words)
                .into_iter()
                .enumerate()
                .map(|(table_index, rows)| Table {
                    page: page.page,
                    table_index,
                    rows,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn page_tables(words: &[Word]) -> Vec<Vec<Vec<Option<String>>>> {
    let mut tables = Vec::new();
    let mut run: Vec<Line> = Vec::new();

    for line in lines(words) {
        let adjacent = run.last().map_or(true, |prev: &Line| {
            line.top - prev.bottom <= prev.bottom - prev.top
        });
        if line.cells.len() < 2 || !adjacent {
            flush(&mut run, &mut tables);
        }
        if line.cells.len() >= 2 {
            run.push(line);
        }
    }
    flush(&mut run, &mut tables);
    tables
}

fn flush(run: &mut Vec<Line>, tables: &mut Vec<Vec<Vec<Option<String>>>>) {
    if run.len() >= MIN_ROWS {
        tables.push(align(run));
    }
    run.clear();
}

/// Groups words into lines ordered top to bottom, each split into cells.
fn lines(words: &[Word]) -> Vec<Line> {
    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| a.bottom.total_cmp(&b.bottom).then(a.x0.total_cmp(&b.x0)));

    let mut grouped: Vec<Vec<&Word>> = Vec::new();
    for word in sorted {
        match grouped.last_mut() {
            Some(line) if (line[0].bottom - word.bottom).abs() <= LINE_TOLERANCE => {
                line.push(word)
            }
            _ => grouped.push(vec![word]),
        }
    }

    grouped
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let top = line.iter().map(|w| w.top).fold(f64::INFINITY, f64::min);
            let bottom = line.iter().map(|w| w.bottom).fold(f64::NEG_INFINITY, f64::max);
            let gap = bottom - top;

            let mut cells: Vec<Cell> = Vec::new();
            for word in line {
                match cells.last_mut() {
                    Some(cell) if word.x0 - cell.x1 <= gap => {
                        cell.text.push(' ');
                        cell.text.push_str(&word.text);
                        cell.x1 = cell.x1.max(word.x1);
                    }
                    _ => cells.push(Cell {
                        x0: word.x0,
                        x1: word.x1,
                        text: word.text.clone(),
                    }),
                }
            }
            Line { top, bottom, cells }
        })
        .collect()
}

/// Places each cell in the column whose left edge is nearest at or before it.
fn align(run: &[Line]) -> Vec<Vec<Option<String>>> {
    let mut edges: Vec<f64> = run
        .iter()
        .flat_map(|line| line.cells.iter().map(|c| c.x0))
        .collect();
    edges.sort_by(f64::total_cmp);

    let mut columns: Vec<f64> = Vec::new();
    for edge in edges {
        if columns.last().map_or(true, |&last| edge - last > COLUMN_TOLERANCE) {
            columns.push(edge);
        }
    }

    run.iter()
        .map(|line| {
            let mut row: Vec<Option<String>> = vec![None; columns.len()];
            for cell in &line.cells {
                let index = columns
                    .iter()
                    .rposition(|&column| column <= cell.x0 + COLUMN_TOLERANCE)
                    .unwrap_or(0);
                match &mut row[index] {
                    Some(text) => {
                        text.push(' ');
                        text.push_str(&cell.text);
                    }
                    slot => *slot = Some(cell.text.clone()),
                }
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 12pt Courier word starting at `x0` on the line whose top is `top`.
    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word {
            text: text.to_string(),
            x0,
            x1: x0 + 7.2 * text.len() as f64,
            top,
            bottom: top + 12.0,
        }
    }

    fn cell(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    fn page(words: Vec<Word>) -> Vec<PageWords> {
        vec![PageWords {
            page: 1,
            height: 792.0,
            words,
        }]
    }

    #[test]
    fn test_aligned_rows_form_one_table() {
        let pages = page(vec![
            word("Item", 50.0, 100.0),
            word("Qty", 150.0, 100.0),
            word("Price", 250.0, 100.0),
            word("Green", 50.0, 114.0),
            word("tea", 93.2, 114.0),
            word("2", 150.0, 114.0),
            word("4.50", 250.0, 114.0),
            word("Scone", 50.0, 128.0),
            word("1.25", 250.0, 128.0),
        ]);

        let tables = extract_tables(&pages, &[1]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 1);
        assert_eq!(tables[0].table_index, 0);
        assert_eq!(
            tables[0].rows,
            vec![
                vec![cell("Item"), cell("Qty"), cell("Price")],
                vec![cell("Green tea"), cell("2"), cell("4.50")],
                vec![cell("Scone"), None, cell("1.25")],
            ]
        );
    }

    #[test]
    fn test_prose_lines_separate_tables() {
        let pages = page(vec![
            word("a", 50.0, 100.0),
            word("b", 150.0, 100.0),
            word("c", 50.0, 114.0),
            word("d", 150.0, 114.0),
            word("Some", 50.0, 128.0),
            word("prose", 86.0, 128.0),
            word("e", 50.0, 142.0),
            word("f", 150.0, 142.0),
            word("g", 50.0, 156.0),
            word("h", 150.0, 156.0),
        ]);

        let tables = extract_tables(&pages, &[1]);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].table_index, 1);
        assert_eq!(tables[1].rows[0], vec![cell("e"), cell("f")]);
    }

    #[test]
    fn test_single_row_or_distant_rows_are_not_tables() {
        let pages = page(vec![
            word("a", 50.0, 100.0),
            word("b", 150.0, 100.0),
            word("c", 50.0, 400.0),
            word("d", 150.0, 400.0),
        ]);
        assert!(extract_tables(&pages, &[1]).is_empty());
    }

    #[test]
    fn test_unselected_pages_are_skipped() {
        let pages = page(vec![
            word("a", 50.0, 100.0),
            word("b", 150.0, 100.0),
            word("c", 50.0, 114.0),
            word("d", 150.0, 114.0),
        ]);
        assert!(extract_tables(&pages, &[2]).is_empty());
        assert_eq!(extract_tables(&pages, &[1]).len(), 1);
    }
}
