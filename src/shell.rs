//! POSIX shell word splitting, enough for `KEY="value"` config lines and
//! fixed command lines such as `vagrant ssh -- /vbin/info`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("trailing backslash")]
    TrailingBackslash,
}

/// Split `line` into words the way `sh` would, without expansion.
///
/// A `#` at the start of a word begins a comment that runs to end of line,
/// as in `sh` (intentional: a commented-out `#KEY=value` line in
/// `Vagrantfile.conf` yields no words and defines nothing). A `#` inside a
/// word (`KEY=a#b`) is literal.
pub fn split_words(line: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '#' if !in_word => break,
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => word.push(ch),
                        None => return Err(SplitError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('\\' | '"' | '$' | '`')) => word.push(ch),
                            Some('\n') => {}
                            Some(ch) => {
                                word.push('\\');
                                word.push(ch);
                            }
                            None => return Err(SplitError::UnterminatedQuote('"')),
                        },
                        Some(ch) => word.push(ch),
                        None => return Err(SplitError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some('\n') => {}
                    Some(ch) => word.push(ch),
                    None => return Err(SplitError::TrailingBackslash),
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command() {
        assert_eq!(
            split_words("vagrant ssh -- /vbin/wifi-download-test.sh").unwrap(),
            vec!["vagrant", "ssh", "--", "/vbin/wifi-download-test.sh"]
        );
    }

    #[test]
    fn test_quoted_assignments() {
        assert_eq!(
            split_words(r#"MACHINE_NAME="wifi bench vm""#).unwrap(),
            vec!["MACHINE_NAME=wifi bench vm"]
        );
        assert_eq!(
            split_words("SNAPSHOT_NAME='clean $state'").unwrap(),
            vec!["SNAPSHOT_NAME=clean $state"]
        );
        assert_eq!(
            split_words(r#"A="say \"hi\"" B=c\ d"#).unwrap(),
            vec![r#"A=say "hi""#, "B=c d"]
        );
    }

    #[test]
    fn test_empty_quotes_make_a_word() {
        assert_eq!(split_words("KEY=''").unwrap(), vec!["KEY="]);
        assert_eq!(split_words(r#""""#).unwrap(), vec![""]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(split_words("KEY=v # note").unwrap(), vec!["KEY=v"]);
        assert_eq!(split_words("KEY=a#b").unwrap(), vec!["KEY=a#b"]);
        assert!(split_words("# KEY=v").unwrap().is_empty());
        assert!(split_words("#KEY=v").unwrap().is_empty());
        assert_eq!(split_words("'#KEY'=v").unwrap(), vec!["#KEY=v"]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            split_words("KEY=\"open"),
            Err(SplitError::UnterminatedQuote('"'))
        );
        assert_eq!(
            split_words("KEY='open"),
            Err(SplitError::UnterminatedQuote('\''))
        );
        assert_eq!(split_words("KEY=\\"), Err(SplitError::TrailingBackslash));
    }
}
