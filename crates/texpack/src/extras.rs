//! The side list of extra files to include in the output directory.
//!
//! The list is a plain text file with one path per line.
//! Blank lines and lines starting with `#` or `%` are ignored.

use std::path::PathBuf;

/// Name of the side list, relative to the project root.
pub const FILE_NAME: &str = "extra.txt";

/// Parse the side list into the paths it names, in order.
pub fn parse(source: &str) -> Vec<PathBuf> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(['#', '%']))
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_skips_blanks_and_comments() {
        let source = "figs/logo.png\n\n# generated data\n  data/table.csv  \n% old\r\nREADME\n";
        let want: Vec<PathBuf> = vec![
            "figs/logo.png".into(),
            "data/table.csv".into(),
            "README".into(),
        ];
        assert_eq!(parse(source), want);
    }

    #[test]
    fn parse_empty() {
        assert_eq!(parse(""), Vec::<PathBuf>::new());
        assert_eq!(parse("\n  \n"), Vec::<PathBuf>::new());
    }
}
