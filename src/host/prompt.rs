//! Numbered-menu selection on the terminal.

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};

use super::Prompter;

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn select(&self, prompt: &str, options: &[String]) -> Result<String> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        choose(&mut stdin.lock(), &mut stdout.lock(), prompt, options)
    }
}

/// Print `options` as a numbered list and read choices until one is valid.
///
/// Accepts the option text, or failing that the option number. EOF aborts.
fn choose<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    options: &[String],
) -> Result<String> {
    if options.is_empty() {
        bail!("nothing to select from");
    }

    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {:>2}) {}", i + 1, option)?;
    }

    loop {
        let label = if prompt.is_empty() { "Select: " } else { prompt };
        write!(output, "{}", label)?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read selection")?;
        if read == 0 {
            bail!("selection aborted (end of input)");
        }

        let answer = line.trim();
        // Option text first: release versions are numbers too
        if let Some(option) = options.iter().find(|o| o.as_str() == answer) {
            return Ok(option.clone());
        }
        if let Ok(n) = answer.parse::<usize>() {
            if (1..=options.len()).contains(&n) {
                return Ok(options[n - 1].clone());
            }
        }
        writeln!(output, "Invalid choice '{}'", answer)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn opts() -> Vec<String> {
        vec!["arch".into(), "fedora".into(), "leap".into()]
    }

    #[test]
    fn test_select_by_number() {
        let mut input = Cursor::new("2\n");
        let mut output = Vec::new();
        let choice = choose(&mut input, &mut output, "Pick: ", &opts()).unwrap();
        assert_eq!(choice, "fedora");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains(" 3) leap"));
    }

    #[test]
    fn test_select_by_name_after_invalid() {
        let mut input = Cursor::new("9\nleap\n");
        let mut output = Vec::new();
        let choice = choose(&mut input, &mut output, "", &opts()).unwrap();
        assert_eq!(choice, "leap");
        assert!(String::from_utf8(output).unwrap().contains("Invalid choice '9'"));
    }

    #[test]
    fn test_numeric_options_match_text_first() {
        let versions: Vec<String> = vec!["32".into(), "33".into()];
        let mut output = Vec::new();
        let choice = choose(&mut Cursor::new("33\n"), &mut output, "", &versions).unwrap();
        assert_eq!(choice, "33");

        let reversed: Vec<String> = vec!["2".into(), "1".into()];
        let choice = choose(&mut Cursor::new("1\n"), &mut output, "", &reversed).unwrap();
        assert_eq!(choice, "1");
    }

    #[test]
    fn test_numeric_options_fall_back_to_index() {
        let versions: Vec<String> = vec!["32".into(), "33".into()];
        let mut output = Vec::new();
        let choice = choose(&mut Cursor::new("2\n"), &mut output, "", &versions).unwrap();
        assert_eq!(choice, "33");
    }

    #[test]
    fn test_eof_aborts() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert!(choose(&mut input, &mut output, "", &opts()).is_err());
    }

    #[test]
    fn test_empty_options() {
        let mut input = Cursor::new("1\n");
        let mut output = Vec::new();
        assert!(choose(&mut input, &mut output, "", &[]).is_err());
    }
}
