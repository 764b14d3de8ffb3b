// Boxed text tables for the terminal view.
// Widths count visible characters, so colour escapes in a cell never shift the borders.

const MIN_COLUMN: usize = 3;
const ELLIPSIS: &str = "…";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy)]
enum Line {
    Header { green: bool },
    Record,
}

/// Column widths settled once per table and shared by every line drawn from it.
struct Layout {
    widths: Vec<usize>,
}

impl Layout {
    /// Widest cell per column, then the widest column gives up one character at a time
    /// until the table fits `max_width` or nothing is left above the minimum.
    fn fit(cols: &[&str], rows: &[Vec<String>], max_width: usize) -> Self {
        let mut widths: Vec<usize> = cols
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rows.iter()
                    .filter_map(|r| r.get(i))
                    .map(|cell| visible_len(cell))
                    .fold(visible_len(name), usize::max)
            })
            .collect();
        // each column costs its width plus "| " and " ", and the row closes with "|"
        let chrome = 3 * widths.len() + 1;
        while widths.iter().sum::<usize>() + chrome > max_width {
            let widest = (0..widths.len()).rev().max_by_key(|&i| widths[i]);
            match widest {
                Some(i) if widths[i] > MIN_COLUMN => widths[i] -= 1,
                _ => break,
            }
        }
        Layout { widths }
    }

    fn rule(&self) -> String {
        self.widths.iter().fold(String::from("+"), |mut acc, w| {
            acc.push_str(&"-".repeat(w + 2));
            acc.push('+');
            acc
        })
    }

    fn line(&self, cells: &[String], kind: Line) -> String {
        let mut acc = String::from("|");
        for (i, &width) in self.widths.iter().enumerate() {
            let raw = cells.get(i).map(String::as_str).unwrap_or("");
            let text = clip(raw, width);
            let fill = " ".repeat(width.saturating_sub(visible_len(&text)));
            let cell = match kind {
                Line::Header { green: true } => format!("{GREEN}{text}{RESET}{fill}"),
                Line::Record if looks_numeric(raw) => format!("{fill}{text}"),
                _ => format!("{text}{fill}"),
            };
            acc.push(' ');
            acc.push_str(&cell);
            acc.push_str(" |");
        }
        acc
    }
}

/// Render `rows` under `cols` as a boxed table no wider than `max_width` where possible.
/// Numeric-looking cells are right-aligned; long cells are cut short with an ellipsis.
pub fn render_table(cols: &[&str], rows: &[Vec<String>], max_width: usize, color_header: bool) -> String {
    let layout = Layout::fit(cols, rows, max_width);
    let rule = layout.rule();
    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();

    let mut lines = Vec::with_capacity(rows.len() + 5);
    lines.push(rule.clone());
    lines.push(layout.line(&header, Line::Header { green: color_header }));
    lines.push(rule.clone());
    lines.extend(rows.iter().map(|r| layout.line(r, Line::Record)));
    lines.push(rule);
    lines.push(format!("rows: {}", rows.len()));
    lines.join("\n")
}

fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some(_) if max <= 1 => ELLIPSIS.to_string(),
        Some(_) => s.chars().take(max - 1).chain(ELLIPSIS.chars()).collect(),
    }
}

// Weights, ages and ids: digits with the usual number punctuation.
fn looks_numeric(s: &str) -> bool {
    let s = s.trim();
    s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E' | ',' | '_'))
}

fn visible_len(s: &str) -> usize {
    let mut pieces = s.split('\x1b');
    let lead = pieces.next().map_or(0, |p| p.chars().count());
    lead + pieces
        .map(|p| match p.strip_prefix('[') {
            // CSI: everything up to and including the final letter is invisible
            Some(rest) => rest
                .find(|c: char| c.is_ascii_alphabetic())
                .map_or(0, |end| rest[end + 1..].chars().count()),
            None => p.chars().count(),
        })
        .sum::<usize>()
}
