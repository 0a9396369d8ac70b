pub mod commands;
pub mod ui;

use std::io::{self, BufRead, Write};

use crate::mail::query::SearchFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    CreateToken,
    ListIds,
    ReadOne,
    ListWithFilter,
}

impl MenuOption {
    pub const ALL: [MenuOption; 4] = [
        MenuOption::CreateToken,
        MenuOption::ListIds,
        MenuOption::ReadOne,
        MenuOption::ListWithFilter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuOption::CreateToken => "Create-Token",
            MenuOption::ListIds => "List EmailIds in Inbox",
            MenuOption::ReadOne => "Enter EmailID to Read Email",
            MenuOption::ListWithFilter => "List Emails with Filter",
        }
    }

    /// Parse the number typed at the menu prompt.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<usize>().ok()? {
            n @ 1..=4 => Some(Self::ALL[n - 1]),
            _ => None,
        }
    }
}

/// Print `label` and read one trimmed line. EOF reads as an empty line.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> io::Result<String> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn prompt_menu<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<MenuOption>> {
    writeln!(out, "Select from the following options:")?;
    for (i, opt) in MenuOption::ALL.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, opt.label())?;
    }
    let answer = prompt(input, out, "Enter option: ")?;
    Ok(MenuOption::parse(&answer))
}

fn non_blank(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Ask for each filter field; blank answers skip the field.
pub fn prompt_filter<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<SearchFilter> {
    writeln!(out, "Enter filter criteria. Leave blank to skip a filter.")?;
    Ok(SearchFilter {
        from: non_blank(prompt(input, out, "From (email address): ")?),
        to: non_blank(prompt(input, out, "To (email address): ")?),
        subject: non_blank(prompt(input, out, "Subject: ")?),
        after: non_blank(prompt(input, out, "Start Date (YYYY/MM/DD): ")?),
        before: non_blank(prompt(input, out, "End Date (YYYY/MM/DD): ")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn menu_accepts_one_to_four() {
        assert_eq!(MenuOption::parse("1"), Some(MenuOption::CreateToken));
        assert_eq!(MenuOption::parse(" 4\n"), Some(MenuOption::ListWithFilter));
        assert_eq!(MenuOption::parse("0"), None);
        assert_eq!(MenuOption::parse("5"), None);
        assert_eq!(MenuOption::parse("two"), None);
    }

    #[test]
    fn prompt_menu_lists_options() {
        let mut input = Cursor::new("3\n");
        let mut out = Vec::new();
        let choice = prompt_menu(&mut input, &mut out).unwrap();

        assert_eq!(choice, Some(MenuOption::ReadOne));
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("1. Create-Token"));
        assert!(shown.contains("4. List Emails with Filter"));
        assert!(shown.ends_with("Enter option: "));
    }

    #[test]
    fn filter_prompts_skip_blank_answers() {
        let mut input = Cursor::new("alice@x.com\n\n  hi \n\n2024/03/01\n");
        let mut out = Vec::new();
        let f = prompt_filter(&mut input, &mut out).unwrap();

        assert_eq!(f.from.as_deref(), Some("alice@x.com"));
        assert_eq!(f.to, None);
        assert_eq!(f.subject.as_deref(), Some("hi"));
        assert_eq!(f.after, None);
        assert_eq!(f.before.as_deref(), Some("2024/03/01"));
        assert_eq!(f.to_query(), "from:alice@x.com subject:hi before:2024/03/01");
    }

    #[test]
    fn eof_reads_as_blank() {
        let mut input = Cursor::new("");
        let mut out = Vec::new();
        assert_eq!(prompt(&mut input, &mut out, "Subject: ").unwrap(), "");
    }
}
