//! Escaping of filesystem paths inside free-form option strings
//!
//! Option strings such as `-Dlog=/var/my logs/app.log -Xmx512m` are split on
//! whitespace before being handed to a process. Paths that contain spaces
//! need their interior spaces escaped (`\ `) first.
//!
//! Rule: a *path run* is a maximal sequence of word characters
//! (`[A-Za-z0-9_]`) and spaces that directly follows a path separator (`/`
//! or `\`). A space inside a path run is escaped when it is not the first
//! character of the run and the character after it exists and is not `-`.
//! A space followed by `-` starts the next flag and is left alone, so is a
//! trailing space at the end of the input.
//!
//! An already escaped space is a backslash followed by a space, which makes
//! that space the first character of a new run. It is never escaped twice,
//! so the rewrite is a fixed point: `escape(escape(s)) == escape(s)`.

/// Escape un-escaped interior spaces of paths in an option string
pub fn escape_paths(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len() + 8);

    // Length of the current path run, None outside a run
    let mut run: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '/' | '\\' => {
                output.push(c);
                run = Some(0);
            }
            ' ' => {
                if let Some(len) = run {
                    let next_is_flag = match chars.get(i + 1) {
                        Some(next) => *next == '-',
                        None => true,
                    };
                    if len > 0 && !next_is_flag {
                        output.push('\\');
                    }
                }
                output.push(c);
                run = run.map(|len| len + 1);
            }
            c if is_word(c) => {
                output.push(c);
                run = run.map(|len| len + 1);
            }
            _ => {
                output.push(c);
                run = None;
            }
        }
    }

    output
}

/// Split an escaped option string into individual arguments.
///
/// Splits on whitespace that is not preceded by a backslash and turns `\ `
/// into a plain space. Any other backslash is kept, so Windows paths survive.
pub fn split_options(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("-Xmx512m -Dfoo=bar", "-Xmx512m -Dfoo=bar" ; "no paths")]
    #[test_case("/opt/my server/bin -Xmx512m", r"/opt/my\ server/bin -Xmx512m" ; "path before flag")]
    #[test_case(r"C:\Program Files\app.jar", r"C:\Program\ Files\app.jar" ; "windows path")]
    #[test_case("/data/my big old dir -v", r"/data/my\ big\ old\ dir -v" ; "three words")]
    #[test_case("/opt/app -Xmx1g", "/opt/app -Xmx1g" ; "path ending before flag")]
    #[test_case("/a b -x /c d -y", r"/a\ b -x /c\ d -y" ; "two paths")]
    #[test_case("/a  b", r"/a\ \ b" ; "double space")]
    #[test_case("/a b ", r"/a\ b " ; "trailing space kept")]
    #[test_case(r"/opt/my\ server/bin -Xmx512m", r"/opt/my\ server/bin -Xmx512m" ; "already escaped")]
    #[test_case("/ a", "/ a" ; "space right after separator")]
    #[test_case("", "" ; "empty")]
    fn test_escape_paths(input: &str, expected: &str) {
        assert_eq!(escape_paths(input), expected);
    }

    #[test]
    fn test_flag_looking_directory_is_not_joined() {
        // A space followed by '-' always separates arguments, even inside what
        // was meant to be a single path.
        assert_eq!(escape_paths("/tmp/dir -name/x"), "/tmp/dir -name/x");
    }

    #[test]
    fn test_split_options() {
        assert_eq!(
            split_options(r"-Dlog=/opt/my\ logs/a.log  -Xmx512m"),
            vec!["-Dlog=/opt/my logs/a.log", "-Xmx512m"]
        );
        assert_eq!(split_options(r"C:\Program\ Files\app.jar"), vec![r"C:\Program Files\app.jar"]);
        assert!(split_options("   ").is_empty());
    }

    #[test]
    fn test_escape_then_split_keeps_paths_together() {
        let escaped = escape_paths("-Dconfig=/etc/my app/conf.xml --port 8080");
        assert_eq!(
            split_options(&escaped),
            vec!["-Dconfig=/etc/my app/conf.xml", "--port", "8080"]
        );
    }

    proptest! {
        #[test]
        fn prop_escape_is_idempotent(s in "[a-zA-Z0-9_ /\\\\.:=-]{0,40}") {
            let once = escape_paths(&s);
            prop_assert_eq!(escape_paths(&once), once);
        }

        #[test]
        fn prop_without_separators_is_identity(s in "[a-zA-Z0-9_ .:=-]{0,40}") {
            prop_assert_eq!(escape_paths(&s), s);
        }

        #[test]
        fn prop_only_inserts_backslashes(s in "[a-zA-Z0-9_ /\\\\-]{0,40}") {
            let escaped = escape_paths(&s);
            prop_assert_eq!(escaped.replace("\\ ", " "), s.replace("\\ ", " "));
        }
    }
}
