//! Terminal prompts.

use std::io::{self, IsTerminal, Write};

use anyhow::Result;

/// Whether we can ask the user anything.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Read one line, offering `default` when the answer is blank.
pub fn line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(d) if input.is_empty() => d.to_string(),
        _ => input.to_string(),
    })
}

/// Use `value` when given, otherwise ask for it.
pub fn or_ask(value: Option<&String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v.clone()),
        None => line(label, None),
    }
}

pub fn password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", label))?)
}

/// Yes/no question. A blank answer picks `default_yes`.
pub fn confirm(question: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    print!("{} [{}]: ", question, hint);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_answer(&input, default_yes))
}

fn parse_answer(input: &str, default_yes: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    }
}
