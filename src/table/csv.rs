use super::{Cell, SchemaMismatchError, Table};

/// Parse comma-separated text with a header line into a [`Table`].
///
/// Fields may be wrapped in double quotes; a doubled quote inside a quoted
/// field is a literal quote. Blank lines are skipped. Quoted fields cannot
/// span lines.
pub fn read_csv(raw: &str) -> Result<Table, SchemaMismatchError> {
    // Spreadsheet exports often lead with a UTF-8 byte-order mark.
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines.next().ok_or(SchemaMismatchError::Empty)?;
    let columns = split_fields(header, header_line)?
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    let mut table = Table::new(columns)?;

    for (line_no, line) in lines {
        let fields = split_fields(line, line_no)?;
        if fields.len() != table.n_cols() {
            return Err(SchemaMismatchError::RaggedRow {
                line: line_no,
                expected: table.n_cols(),
                found: fields.len(),
            });
        }
        table.push_row(fields.iter().map(|f| Cell::parse(f)).collect())?;
    }

    Ok(table)
}

fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>, SchemaMismatchError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(SchemaMismatchError::UnterminatedQuote { line: line_no });
    }
    fields.push(current);
    Ok(fields)
}
