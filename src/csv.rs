//! Permissive CSV decoding for the published sheet export.
//!
//! The export is operator-edited, so the decoder never rejects input: stray
//! blank lines are skipped, ragged rows are kept as-is, and an unterminated
//! quote simply runs to the end of the text.

/// One decoded line of the sheet, one entry per column.
pub type RawRow = Vec<String>;

#[derive(Default)]
struct Decoder {
    rows: Vec<RawRow>,
    row: RawRow,
    field: String,
    in_quotes: bool,
}

impl Decoder {
    fn close_field(&mut self) {
        self.row.push(std::mem::take(&mut self.field));
    }

    fn has_pending(&self) -> bool {
        !self.row.is_empty() || !self.field.is_empty()
    }

    /// Closes the current row, dropping it when nothing was read since the
    /// previous terminator.
    fn close_row(&mut self) {
        if self.has_pending() {
            self.close_field();
            self.rows.push(std::mem::take(&mut self.row));
        }
    }

    fn finish(mut self) -> Vec<RawRow> {
        self.close_row();
        self.rows
    }
}

/// Splits CSV text into rows of fields.
///
/// Quoted fields may contain commas, line breaks and doubled quotes (`""`).
/// Line terminators are `\n`, `\r\n` or a lone `\r`.
pub fn decode(text: &str) -> Vec<RawRow> {
    let mut decoder = Decoder::default();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if decoder.in_quotes && chars.peek() == Some(&'"') {
                    decoder.field.push('"');
                    chars.next();
                } else {
                    decoder.in_quotes = !decoder.in_quotes;
                }
            }
            ',' if !decoder.in_quotes => decoder.close_field(),
            '\n' | '\r' if !decoder.in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                decoder.close_row();
            }
            _ => decoder.field.push(ch),
        }
    }

    decoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<RawRow> {
        raw.iter()
            .map(|row| row.iter().map(|field| field.to_string()).collect())
            .collect()
    }

    #[test]
    fn splits_simple_rows() {
        let decoded = decode("ts,title,details\n2024-01-01,Study A,Paid\n");
        assert_eq!(
            decoded,
            rows(&[&["ts", "title", "details"], &["2024-01-01", "Study A", "Paid"]])
        );
    }

    #[test]
    fn quoted_field_keeps_delimiters_newlines_and_quotes() {
        let decoded = decode("\"a,b\"\"c\nd\"");
        assert_eq!(decoded, rows(&[&["a,b\"c\nd"]]));
    }

    #[test]
    fn crlf_and_lone_cr_terminate_rows() {
        let decoded = decode("a,b\r\nc,d\re,f");
        assert_eq!(decoded, rows(&[&["a", "b"], &["c", "d"], &["e", "f"]]));
    }

    #[test]
    fn crlf_inside_quotes_is_literal() {
        let decoded = decode("\"line1\r\nline2\",x");
        assert_eq!(decoded, rows(&[&["line1\r\nline2", "x"]]));
    }

    #[test]
    fn blank_lines_are_dropped() {
        let decoded = decode("\n\nh1,h2\n\n\r\nv1,v2\n\n");
        assert_eq!(decoded, rows(&[&["h1", "h2"], &["v1", "v2"]]));
    }

    #[test]
    fn row_of_only_delimiters_is_kept() {
        // A lone comma pushes a field before the terminator, so the row is
        // not trivial even though every field is empty.
        let decoded = decode("h\n,\n");
        assert_eq!(decoded, rows(&[&["h"], &["", ""]]));
    }

    #[test]
    fn empty_quoted_field_on_its_own_line_is_dropped() {
        let decoded = decode("h\n\"\"\nx");
        assert_eq!(decoded, rows(&[&["h"], &["x"]]));
    }

    #[test]
    fn trailing_row_without_newline_is_flushed() {
        let decoded = decode("a,b\nc,");
        assert_eq!(decoded, rows(&[&["a", "b"], &["c", ""]]));
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let decoded = decode("a,\"open field\nstill open,too");
        assert_eq!(decoded, rows(&[&["a", "open field\nstill open,too"]]));
    }

    #[test]
    fn quotes_mid_field_toggle_without_emitting() {
        let decoded = decode("ab\"c,d\"e,f");
        assert_eq!(decoded, rows(&[&["abc,de", "f"]]));
    }

    #[test]
    fn empty_and_whitespace_inputs() {
        assert!(decode("").is_empty());
        assert!(decode("\r\n\n\r").is_empty());
        assert_eq!(decode("   "), rows(&[&["   "]]));
    }

    #[test]
    fn ragged_rows_are_preserved() {
        let decoded = decode("a,b,c\n1\n1,2,3,4\n");
        assert_eq!(
            decoded,
            rows(&[&["a", "b", "c"], &["1"], &["1", "2", "3", "4"]])
        );
    }

    #[test]
    fn multibyte_text_passes_through() {
        let decoded = decode("タイムスタンプ,タイトル\n2024/01/01,\"心理学実験, 謝礼あり\"");
        assert_eq!(
            decoded,
            rows(&[
                &["タイムスタンプ", "タイトル"],
                &["2024/01/01", "心理学実験, 謝礼あり"]
            ])
        );
    }
}
