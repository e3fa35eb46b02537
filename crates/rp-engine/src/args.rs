//! Splitting an option string into process arguments.
//!
//! The form passes the options as one string. ffmpeg needs an argv, so the
//! string is split on whitespace with shell-like grouping: single quotes keep
//! everything literal, double quotes keep whitespace and allow `\"` and `\\`,
//! and a backslash outside quotes escapes the next character. Quote characters
//! themselves are not part of the resulting arguments, so
//! `-vf "pad=ceil(iw/2)*2:ceil(ih/2)*2"` becomes two arguments.

use rp_core::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `input` into arguments.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unterminated quote or a trailing
/// backslash.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    // Distinguishes `""` (an empty argument) from no argument at all.
    let mut in_arg = false;
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => {
                        return Err(Error::Validation(
                            "unterminated double quote in options".into(),
                        ))
                    }
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_arg = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_arg = true;
                }
                '\\' => match chars.next() {
                    Some(next) => {
                        current.push(next);
                        in_arg = true;
                    }
                    None => {
                        return Err(Error::Validation(
                            "trailing backslash in options".into(),
                        ))
                    }
                },
                c if c.is_whitespace() => {
                    if in_arg {
                        args.push(std::mem::take(&mut current));
                        in_arg = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_arg = true;
                }
            },
        }
    }

    match quote {
        Quote::Single => Err(Error::Validation(
            "unterminated single quote in options".into(),
        )),
        Quote::Double => Err(Error::Validation(
            "unterminated double quote in options".into(),
        )),
        Quote::None => {
            if in_arg {
                args.push(current);
            }
            Ok(args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            tokenize("-a  -b\t-c\n-d").unwrap(),
            vec!["-a", "-b", "-c", "-d"]
        );
    }

    #[test]
    fn empty_input_has_no_args() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \n ").unwrap().is_empty());
    }

    #[test]
    fn double_quotes_group_and_are_removed() {
        let args = tokenize(r#"-threads 8 -vf "pad=ceil(iw/2)*2:ceil(ih/2)*2" -pix_fmt yuv420p"#)
            .unwrap();
        assert_eq!(
            args,
            vec![
                "-threads",
                "8",
                "-vf",
                "pad=ceil(iw/2)*2:ceil(ih/2)*2",
                "-pix_fmt",
                "yuv420p"
            ]
        );
    }

    #[test]
    fn quotes_keep_whitespace() {
        assert_eq!(
            tokenize(r#"-metadata "title=My Clip" -x 'a b'"#).unwrap(),
            vec!["-metadata", "title=My Clip", "-x", "a b"]
        );
    }

    #[test]
    fn adjacent_quoted_parts_join() {
        assert_eq!(tokenize(r#"a"b c"'d'"#).unwrap(), vec!["ab cd"]);
    }

    #[test]
    fn empty_quotes_are_an_argument() {
        assert_eq!(tokenize(r#"-x "" -y"#).unwrap(), vec!["-x", "", "-y"]);
    }

    #[test]
    fn escapes() {
        assert_eq!(tokenize(r"a\ b").unwrap(), vec!["a b"]);
        assert_eq!(tokenize(r#""say \"hi\"""#).unwrap(), vec![r#"say "hi""#]);
        assert_eq!(tokenize(r#""c:\dir""#).unwrap(), vec![r"c:\dir"]);
        assert_eq!(tokenize(r"'\n'").unwrap(), vec![r"\n"]);
    }

    #[test]
    fn unterminated_quotes_fail() {
        assert!(matches!(tokenize(r#"-vf "pad"#), Err(Error::Validation(_))));
        assert!(matches!(tokenize("-x 'abc"), Err(Error::Validation(_))));
        assert!(matches!(tokenize(r"abc\"), Err(Error::Validation(_))));
    }

    #[test]
    fn default_preset_tokenizes() {
        let joined = rp_core::config::DEFAULT_OPTIONS.split('\n').collect::<Vec<_>>().join(" ");
        let args = tokenize(&joined).unwrap();
        assert_eq!(args.len(), 24);
        assert_eq!(args[3], "pad=ceil(iw/2)*2:ceil(ih/2)*2");
        assert_eq!(args.last().map(String::as_str), Some("1024k"));
    }
}
