use std::io::{BufRead, Write};

pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> std::io::Result<bool> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn accepts_only_y() {
        for (answer, expected) in [
            ("y\n", true),
            ("Y\n", true),
            ("  y  \r\n", true),
            ("yes\n", false),
            ("n\n", false),
            ("", false),
        ] {
            let mut out = Vec::new();
            let got = confirm(&mut Cursor::new(answer), &mut out, "Continue? [y/n] :")
                .expect("prompt");
            assert_eq!(got, expected, "{answer:?}");
            assert_eq!(out, b"Continue? [y/n] :");
        }
    }
}
