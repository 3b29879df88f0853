//! 📡 **NdjsonComposer**: one statement per line, trailing `\n` included.
//!
//! What's the DEAL with NDJSON? It's JSON but unfriendly. Every line is lonely.
//! No brackets to hold them. No commas to connect them. Just newlines. And silence.

use super::Composer;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NdjsonComposer;

impl Composer for NdjsonComposer {
    #[inline]
    fn compose(&self, statements: &[String]) -> String {
        let estimated_size: usize = statements.iter().map(|s| s.len() + 1).sum();
        let mut payload = String::with_capacity(estimated_size);
        for statement in statements {
            payload.push_str(statement);
            payload.push('\n');
        }
        // -- "He who omits the trailing newline, concatenates two files into one broken line."
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_statements_line_up() {
        let statements = vec![String::from(r#"{"a":1}"#), String::from(r#"{"b":2}"#)];
        assert_eq!(NdjsonComposer.compose(&statements), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn the_one_where_nothing_composes_to_nothing() {
        assert!(NdjsonComposer.compose(&[]).is_empty());
    }
}
