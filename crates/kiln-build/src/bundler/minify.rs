//! Conservative line minifier

use super::{Minifier, MinifyOutput};

/// Drops blank lines, full-line `//` comments and indentation
///
/// Never rewrites inside a line, and leaves the lines of multi-line
/// template literals untouched. Backticks inside strings and comments do
/// not open templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineMinifier;

impl Minifier for LineMinifier {
    fn minify(&self, source: &str) -> MinifyOutput {
        let mut output = String::with_capacity(source.len());
        let mut scanner = Scanner::default();

        for line in source.lines() {
            let starts_in_template = scanner.in_template();
            let starts_in_code = !starts_in_template && !scanner.in_block_comment();
            scanner.scan(line);

            if starts_in_template {
                output.push_str(line);
                output.push('\n');
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || (starts_in_code && trimmed.starts_with("//")) {
                continue;
            }

            if scanner.in_template() {
                // The template opens on this line; keep its trailing text exact
                output.push_str(line.trim_start());
            } else {
                output.push_str(trimmed);
            }
            output.push('\n');
        }

        MinifyOutput {
            output: Some(output),
            diagnostics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Template,
    /// `${ ... }` with the count of braces opened inside it
    Interpolation(usize),
}

/// Lexical state carried from one line to the next
#[derive(Debug, Default)]
struct Scanner {
    frames: Vec<Frame>,
    quote: Option<char>,
    block_comment: bool,
}

impl Scanner {
    fn in_template(&self) -> bool {
        self.quote.is_none() && !self.block_comment && self.frames.last() == Some(&Frame::Template)
    }

    fn in_block_comment(&self) -> bool {
        self.block_comment
    }

    fn scan(&mut self, line: &str) {
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if self.block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.block_comment = false;
                }
                continue;
            }

            if let Some(quote) = self.quote {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    _ if c == quote => self.quote = None,
                    _ => {}
                }
                continue;
            }

            if self.frames.last() == Some(&Frame::Template) {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '`' => {
                        self.frames.pop();
                    }
                    '$' if chars.peek() == Some(&'{') => {
                        chars.next();
                        self.frames.push(Frame::Interpolation(0));
                    }
                    _ => {}
                }
                continue;
            }

            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.block_comment = true;
                }
                '"' | '\'' => self.quote = Some(c),
                '`' => self.frames.push(Frame::Template),
                '{' => {
                    if let Some(Frame::Interpolation(depth)) = self.frames.last_mut() {
                        *depth += 1;
                    }
                }
                '}' => match self.frames.last_mut() {
                    Some(Frame::Interpolation(0)) => {
                        self.frames.pop();
                    }
                    Some(Frame::Interpolation(depth)) => *depth -= 1,
                    _ => {}
                },
                _ => {}
            }
        }

        // Quotes only continue past a line ending escaped with a backslash
        if self.quote.is_some() && !line.ends_with('\\') {
            self.quote = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn minify(source: &str) -> String {
        LineMinifier.minify(source).output.unwrap()
    }

    #[test]
    fn test_strips_blank_lines_and_comments() {
        let source = "// header\nfunction a() {\n\n    return 1; // keep\n}\n";
        assert_eq!(minify(source), "function a() {\nreturn 1; // keep\n}\n");
    }

    #[test]
    fn test_template_lines_untouched() {
        let source = "const t = `\n  // not a comment\n\n  indented\n`;\n  done();\n";
        assert_eq!(
            minify(source),
            "const t = `\n  // not a comment\n\n  indented\n`;\ndone();\n"
        );
    }

    #[rstest]
    #[case::double_quoted("const tick = \"`\";\n")]
    #[case::single_quoted("const tick = '`';\n")]
    #[case::line_comment("const a = 1; // uses `\n")]
    #[case::block_comment("/* a ` inside */\n")]
    #[case::escaped_in_template("const b = `\\``;\n")]
    fn test_stray_backtick_does_not_open_template(#[case] first: &str) {
        let source = format!("{}const tpl = `\n  keep\n`;\n", first);
        let output = minify(&source);
        assert!(output.contains("\n  keep\n`;\n"), "{:?}", output);
    }

    #[test]
    fn test_interpolation_with_nested_template() {
        let source = "const t = `a ${ items.map(i => `<${i}>`) } b\n    tail\n`;\n    next();\n";
        assert_eq!(
            minify(source),
            "const t = `a ${ items.map(i => `<${i}>`) } b\n    tail\n`;\nnext();\n"
        );
    }

    #[test]
    fn test_comment_line_inside_block_comment_kept() {
        let source = "/*\n  // end */\nrun();\n";
        assert_eq!(minify(source), "/*\n// end */\nrun();\n");
    }
}
