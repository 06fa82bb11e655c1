//! Comment stripper for LaTeX source.
//!
//! The stripper is a small lexical automaton.
//! It removes the content of live `%` comments and keeps everything else unchanged.
//! The `%` that starts a comment is kept as an empty placeholder, and so is the
//! newline that ends it, so the lines of the output line up with the lines of the input.
//!
//! Four constructs change the way `%` is interpreted:
//!
//! - `\%` is an escaped percent sign and never starts a comment.
//!     Similarly `\\` is an escaped backslash, so in `\\%` the `%` does start a comment.
//!
//! - `\begin{comment}` ... `\end{comment}` is dropped entirely, including newlines.
//!     The remainder of the line containing `\end{comment}` is dropped too.
//!
//! - `\begin{verbatim}` ... `\end{verbatim}` is kept exactly as written,
//!     including any `%` characters.
//!
//! - `\makeatletter` ... `\makeatother` is kept exactly as written.
//!     Comments inside the block are still tracked, so that a `\makeatother`
//!     appearing in a comment does not end the block.
//!
//! ```
//! assert_eq!(texpack::strip(r"a\%b %comment"), r"a\%b %");
//! ```
//!
//! The automaton is a set of per-state rule tables.
//! At each position the first rule in the active state's table whose pattern matches wins.
//! The scan is a single forward pass and never fails:
//!     an unterminated environment simply persists until the end of the input.

use std::ops::Range;

/// State of the comment stripper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Normal document text.
    Initial,
    /// Inside a `%` comment, which runs until the end of the line.
    LineComment,
    /// Inside a `comment` environment.
    CommentEnv,
    /// Inside a `verbatim` environment.
    Verbatim,
    /// Between `\makeatletter` and `\makeatother`.
    MakeAtBlock,
    /// Inside a `%` comment within a make-at block.
    MakeAtLineComment,
}

/// Kind of a token produced by the stripper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `\\`
    EscapedBackslash,
    /// `\%`
    EscapedPercent,
    /// A `%` that starts a comment.
    Percent,
    /// `\makeatletter`
    MakeAtLetter,
    /// `\makeatother`
    MakeAtOther,
    /// `\begin{comment}`, with optional whitespace around the braces.
    BeginComment,
    /// `\end{comment}`, with optional whitespace around the braces.
    EndComment,
    /// `\begin{verbatim}`, with optional whitespace around the braces.
    BeginVerbatim,
    /// `\end{verbatim}`, with optional whitespace around the braces.
    EndVerbatim,
    Newline,
    /// Any other text.
    ///
    /// A token of this kind is either a single `\` or `%`,
    ///     or a run of characters none of which is `\`, `%` or a newline.
    Char,
}

/// Token produced by the stripper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The source text of the token.
    pub value: &'a str,
    /// Byte range of the token in the source.
    pub span: Range<usize>,
    /// Whether the token appears in the stripped output.
    pub kept: bool,
}

#[derive(Clone, Copy, Debug)]
enum Pattern {
    Literal(&'static str),
    /// `\<delimiter>{<name>}` with optional whitespace before and inside the braces.
    Environment {
        delimiter: &'static str,
        name: &'static str,
    },
    Newline,
    Char,
}

impl Pattern {
    /// Returns the length in bytes of the match at the start of `s`, if there is one.
    fn match_len(&self, s: &str) -> Option<usize> {
        match self {
            Pattern::Literal(literal) => s.starts_with(*literal).then_some(literal.len()),
            Pattern::Environment { delimiter, name } => match_environment(s, delimiter, name),
            Pattern::Newline => s.starts_with('\n').then_some(1),
            Pattern::Char => {
                let c = s.chars().next()?;
                if c == '\n' {
                    return None;
                }
                if is_special(c) {
                    return Some(c.len_utf8());
                }
                // Characters that can't start any other pattern are taken as one run.
                Some(s.find(is_special).unwrap_or(s.len()))
            }
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, '\\' | '%' | '\n')
}

fn match_environment(s: &str, delimiter: &str, name: &str) -> Option<usize> {
    let rest = s.strip_prefix('\\')?.strip_prefix(delimiter)?.trim_start();
    let rest = rest.strip_prefix('{')?.trim_start();
    let rest = rest.strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix('}')?;
    Some(s.len() - rest.len())
}

#[derive(Debug)]
struct Rule {
    pattern: Pattern,
    kind: TokenKind,
    keep: bool,
    next: Option<State>,
}

const fn kept(pattern: Pattern, kind: TokenKind, next: Option<State>) -> Rule {
    Rule {
        pattern,
        kind,
        keep: true,
        next,
    }
}

const fn dropped(pattern: Pattern, kind: TokenKind, next: Option<State>) -> Rule {
    Rule {
        pattern,
        kind,
        keep: false,
        next,
    }
}

const ESCAPED_BACKSLASH: Pattern = Pattern::Literal("\\\\");
const ESCAPED_PERCENT: Pattern = Pattern::Literal("\\%");
const PERCENT: Pattern = Pattern::Literal("%");
const MAKE_AT_LETTER: Pattern = Pattern::Literal("\\makeatletter");
const MAKE_AT_OTHER: Pattern = Pattern::Literal("\\makeatother");
const BEGIN_COMMENT: Pattern = Pattern::Environment {
    delimiter: "begin",
    name: "comment",
};
const END_COMMENT: Pattern = Pattern::Environment {
    delimiter: "end",
    name: "comment",
};
const BEGIN_VERBATIM: Pattern = Pattern::Environment {
    delimiter: "begin",
    name: "verbatim",
};
const END_VERBATIM: Pattern = Pattern::Environment {
    delimiter: "end",
    name: "verbatim",
};

use State::*;
use TokenKind as K;

const INITIAL_RULES: &[Rule] = &[
    kept(ESCAPED_BACKSLASH, K::EscapedBackslash, None),
    kept(ESCAPED_PERCENT, K::EscapedPercent, None),
    kept(PERCENT, K::Percent, Some(LineComment)),
    dropped(BEGIN_COMMENT, K::BeginComment, Some(CommentEnv)),
    kept(BEGIN_VERBATIM, K::BeginVerbatim, Some(Verbatim)),
    kept(MAKE_AT_LETTER, K::MakeAtLetter, Some(MakeAtBlock)),
    kept(Pattern::Char, K::Char, None),
    kept(Pattern::Newline, K::Newline, None),
];

const LINE_COMMENT_RULES: &[Rule] = &[
    kept(Pattern::Newline, K::Newline, Some(Initial)),
    dropped(Pattern::Char, K::Char, None),
];

// The rest of the line after \end{comment} is dropped.
const COMMENT_ENV_RULES: &[Rule] = &[
    dropped(END_COMMENT, K::EndComment, Some(LineComment)),
    dropped(Pattern::Char, K::Char, None),
    dropped(Pattern::Newline, K::Newline, None),
];

const VERBATIM_RULES: &[Rule] = &[
    kept(END_VERBATIM, K::EndVerbatim, Some(Initial)),
    kept(Pattern::Char, K::Char, None),
    kept(Pattern::Newline, K::Newline, None),
];

const MAKE_AT_BLOCK_RULES: &[Rule] = &[
    kept(MAKE_AT_OTHER, K::MakeAtOther, Some(Initial)),
    kept(ESCAPED_BACKSLASH, K::EscapedBackslash, None),
    kept(ESCAPED_PERCENT, K::EscapedPercent, None),
    kept(PERCENT, K::Percent, Some(MakeAtLineComment)),
    kept(Pattern::Char, K::Char, None),
    kept(Pattern::Newline, K::Newline, None),
];

const MAKE_AT_LINE_COMMENT_RULES: &[Rule] = &[
    kept(Pattern::Newline, K::Newline, Some(MakeAtBlock)),
    kept(Pattern::Char, K::Char, None),
];

impl State {
    fn rules(self) -> &'static [Rule] {
        match self {
            Initial => INITIAL_RULES,
            LineComment => LINE_COMMENT_RULES,
            CommentEnv => COMMENT_ENV_RULES,
            Verbatim => VERBATIM_RULES,
            MakeAtBlock => MAKE_AT_BLOCK_RULES,
            MakeAtLineComment => MAKE_AT_LINE_COMMENT_RULES,
        }
    }
}

/// Lexer that drives the comment stripper.
///
/// The lexer yields every token of the source, both kept and dropped.
/// Concatenating the values of the kept tokens gives the stripped source;
///     this is what [strip] does.
pub struct Lexer<'a> {
    source: &'a str,
    /// The current position within the source string.
    current: usize,
    state: State,
    anomalies: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer in the initial state.
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            current: 0,
            state: State::Initial,
            anomalies: 0,
        }
    }

    /// Return the current state of the lexer.
    ///
    /// After the lexer is exhausted this is the state at the end of the input.
    /// Anything other than [State::Initial] or [State::LineComment] means that an
    ///     environment or make-at block was not terminated.
    pub fn state(&self) -> State {
        self.state
    }

    /// Return the number of characters that were skipped because no rule matched them.
    ///
    /// Every rule table ends with rules matching any character, so this is zero for
    ///     the built-in tables.
    /// The skip only guarantees progress if a table is ever made partial.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = &self.source[self.current..];
            let c = rest.chars().next()?;
            let matched = self
                .state
                .rules()
                .iter()
                .find_map(|rule| rule.pattern.match_len(rest).map(|len| (rule, len)));
            let Some((rule, len)) = matched else {
                self.anomalies += 1;
                self.current += c.len_utf8();
                continue;
            };
            let start = self.current;
            self.current += len;
            if let Some(next) = rule.next {
                self.state = next;
            }
            return Some(Token {
                kind: rule.kind,
                value: &self.source[start..self.current],
                span: start..self.current,
                kept: rule.keep,
            });
        }
    }
}

/// Strip the comments from LaTeX source.
pub fn strip(source: &str) -> String {
    Lexer::new(source)
        .filter(|token| token.kept)
        .map(|token| token.value)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! strip_tests {
        ($( ($name: ident, $input: expr, $want: expr $(,)? ), )+ ) => {
            $(
                #[test]
                fn $name() {
                    let input = $input;
                    let want: String = $want.into();
                    let got = strip(&input);
                    similar_asserts::assert_eq!(got: got, want: want);
                }
            )+
        };
    }

    strip_tests!(
        (empty, "", ""),
        (
            no_comments,
            "\\documentclass{article}\n\\begin{document}\nHello, World\n\\end{document}\n",
            "\\documentclass{article}\n\\begin{document}\nHello, World\n\\end{document}\n",
        ),
        (line_comment, "a %comment\nb", "a %\nb"),
        (line_comment_at_end_of_input, "a % trailing", "a %"),
        (consecutive_line_comments, "%one\n%two\n", "%\n%\n"),
        (
            escaped_percent_then_comment,
            "a\\%b %comment\nc",
            "a\\%b %\nc",
        ),
        (escaped_percent, "100\\%", "100\\%"),
        (
            escaped_backslash_then_comment,
            "a\\\\%comment\nb",
            "a\\\\%\nb",
        ),
        (stray_backslash_at_end, "abc\\", "abc\\"),
        (carriage_return_in_comment, "a %c\r\nb", "a %\nb"),
        (
            comment_environment,
            "a\n\\begin{comment}\nhidden % stuff\n\\end{comment} tail\nb",
            "a\n\nb",
        ),
        (
            comment_environment_with_whitespace,
            "\\begin { comment }x\\end{ comment }\ny",
            "\ny",
        ),
        (
            comment_environment_hides_verbatim,
            "\\begin{comment}\\begin{verbatim}\\end{comment}\nx",
            "\nx",
        ),
        (
            unterminated_comment_environment,
            "a\\begin{comment}\nrest %\n",
            "a",
        ),
        (
            begin_comment_inside_line_comment,
            "% \\begin{comment}\nvisible",
            "%\nvisible",
        ),
        (
            verbatim,
            "\\begin{verbatim}\n% not a comment\n\\end{verbatim}",
            "\\begin{verbatim}\n% not a comment\n\\end{verbatim}",
        ),
        (
            comment_after_verbatim,
            "\\begin{verbatim}%x\\end{verbatim}%y\nz",
            "\\begin{verbatim}%x\\end{verbatim}%\nz",
        ),
        (
            unterminated_verbatim,
            "\\begin{verbatim}\n%a\n%b",
            "\\begin{verbatim}\n%a\n%b",
        ),
        (
            make_at_block,
            "\\makeatletter\n%keep this\n\\makeatother",
            "\\makeatletter\n%keep this\n\\makeatother",
        ),
        (
            comment_after_make_at_block,
            "\\makeatletter\n\\def\\x{1}% keep\n\\makeatother\n%drop\n",
            "\\makeatletter\n\\def\\x{1}% keep\n\\makeatother\n%\n",
        ),
        (
            make_at_other_inside_comment,
            "\\makeatletter\n% \\makeatother\n%kept\n\\makeatother%gone\n",
            "\\makeatletter\n% \\makeatother\n%kept\n\\makeatother%\n",
        ),
        (
            escaped_percent_in_make_at_block,
            "\\makeatletter\\%x\\makeatother",
            "\\makeatletter\\%x\\makeatother",
        ),
        (
            binary_garbage,
            "\u{0}\u{1b}\u{fffd}%\u{7f}\n\\",
            "\u{0}\u{1b}\u{fffd}%\n\\",
        ),
    );

    const CORPUS: &[&str] = &[
        "",
        "plain text\nwith lines\n",
        "a\\%b %comment\nc",
        "%one\n%two\n% three",
        "\\\\%x\n\\%y\n",
        "a\n\\begin{comment}\nhidden\n\\end{comment} tail\nb %c\n",
        "\\begin{comment} never closed",
        "x % \\begin{verbatim}\n%\n",
        "Ünïcödé % ☃ snowman\n日本語",
    ];

    #[test]
    fn strip_is_idempotent() {
        for input in CORPUS {
            let once = strip(input);
            let twice = strip(&once);
            similar_asserts::assert_eq!(once: once, twice: twice);
        }
    }

    #[test]
    fn output_is_never_longer_than_input() {
        for input in CORPUS {
            assert!(strip(input).len() <= input.len(), "input: {input:?}");
        }
    }

    #[test]
    fn text_before_comment_is_preserved() {
        for prefix in CORPUS.iter().filter(|s| !s.contains(['%', '\\'])) {
            let input = format!("{prefix}%some suffix\n");
            assert_eq!(strip(&input), format!("{prefix}%\n"));
        }
    }

    /// Every concatenation of at most `max_len` fragments.
    fn generated(fragments: &[&str], max_len: usize) -> Vec<String> {
        let mut all = vec![String::new()];
        let mut previous = vec![String::new()];
        for _ in 0..max_len {
            previous = previous
                .iter()
                .flat_map(move |prefix| {
                    fragments.iter().map(move |fragment| format!("{prefix}{fragment}"))
                })
                .collect();
            all.extend(previous.iter().cloned());
        }
        all
    }

    const PLAIN_FRAGMENTS: &[&str] = &["a", " ", "\t", "\n", "\r\n", "{", "}", "é"];

    const COMMENT_FRAGMENTS: &[&str] = &[
        "a",
        " ",
        "{",
        "\n",
        "%",
        "\\",
        "\\begin{comment}",
        "\\end{comment}",
    ];

    const BLOCK_FRAGMENTS: &[&str] = &[
        "x",
        "\n",
        "%",
        "\\",
        "\\begin{verbatim}",
        "\\end{verbatim}",
        "\\makeatletter",
        "\\makeatother",
    ];

    #[test]
    fn generated_plain_text_is_unchanged() {
        for input in generated(PLAIN_FRAGMENTS, 5) {
            assert_eq!(strip(&input), input);
        }
    }

    #[test]
    fn generated_comments_are_stripped_idempotently() {
        for input in generated(COMMENT_FRAGMENTS, 5) {
            let once = strip(&input);
            assert!(once.len() <= input.len(), "input: {input:?}");
            assert_eq!(strip(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn generated_blocks_are_scanned_completely() {
        for input in generated(BLOCK_FRAGMENTS, 5) {
            let mut lexer = Lexer::new(&input);
            let mut end = 0;
            for token in lexer.by_ref() {
                assert_eq!(token.span.start, end, "input: {input:?}");
                end = token.span.end;
            }
            assert_eq!(end, input.len(), "input: {input:?}");
            assert_eq!(lexer.anomalies(), 0, "input: {input:?}");
            assert!(strip(&input).len() <= input.len(), "input: {input:?}");
        }
    }

    #[test]
    fn tokens() {
        let got: Vec<(TokenKind, &str, bool)> = Lexer::new("ab%c\\%\nd")
            .map(|token| (token.kind, token.value, token.kept))
            .collect();
        let want = vec![
            (TokenKind::Char, "ab", true),
            (TokenKind::Percent, "%", true),
            (TokenKind::Char, "c", false),
            (TokenKind::Char, "\\", false),
            (TokenKind::Char, "%", false),
            (TokenKind::Newline, "\n", true),
            (TokenKind::Char, "d", true),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn token_spans() {
        let spans: Vec<Range<usize>> = Lexer::new("x\\begin {comment}y")
            .map(|token| token.span)
            .collect();
        assert_eq!(spans, vec![0..1, 1..17, 17..18]);
    }

    #[test]
    fn final_state() {
        for (input, want) in [
            ("a", State::Initial),
            ("a % b", State::LineComment),
            ("\\begin{comment}", State::CommentEnv),
            ("\\begin{verbatim}\n", State::Verbatim),
            ("\\makeatletter", State::MakeAtBlock),
            ("\\makeatletter %", State::MakeAtLineComment),
            ("\\makeatletter\\makeatother", State::Initial),
        ] {
            let mut lexer = Lexer::new(input);
            lexer.by_ref().for_each(|_| {});
            assert_eq!(lexer.state(), want, "input: {input:?}");
            assert_eq!(lexer.anomalies(), 0);
        }
    }
}
