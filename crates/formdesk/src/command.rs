//! Console command parsing.

use std::path::PathBuf;

use formdesk_core::{SortDirection, SortField};

/// A console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Next page.
    Next,
    /// Previous page.
    Prev,
    /// Change the sort field.
    Sort(SortField),
    /// Change the sort direction.
    Order(SortDirection),
    /// Toggle the last-24-hours filter.
    Latest(bool),
    /// Set (or clear) the local search string.
    Search(String),
    /// Toggle read on a 1-based visible row.
    Read(usize),
    /// Delete a 1-based visible row, after confirmation.
    Delete(usize),
    /// Export visible rows as CSV.
    Export(Option<PathBuf>),
    /// Reload a failed page.
    Retry,
    /// Dismiss the mutation failure notice.
    Dismiss,
    /// Reload the current page.
    Refresh,
    /// Sign out and return to the login prompt.
    Logout,
    /// Show the command list.
    Help,
    /// Exit.
    Quit,
}

/// Why a line is not a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Blank input.
    #[error("empty command")]
    Empty,
    /// Unrecognized verb.
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    /// Bad or missing argument.
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Command reference printed by `help`.
pub const HELP: &str = "\
Commands:
  next | n                 next page
  prev | p                 previous page
  sort <date|timestamp|name|email>
  order <asc|desc>
  latest <on|off>          only the last 24 hours
  search [text]            filter this page (no text clears)
  read <row>               toggle read/unread
  delete <row>             delete after confirmation
  export [path]            save visible rows as CSV
  retry                    reload after a failed fetch
  dismiss                  hide the error notice
  refresh                  reload the current page
  logout
  help
  quit | q";

impl Command {
    /// Parses one input line.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing what is wrong with the line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

        match verb.to_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "next" | "n" => Ok(Self::Next),
            "prev" | "p" => Ok(Self::Prev),
            "sort" => SortField::parse(rest)
                .map(Self::Sort)
                .ok_or(ParseError::Usage("sort <date|timestamp|name|email>")),
            "order" => SortDirection::parse(rest)
                .map(Self::Order)
                .ok_or(ParseError::Usage("order <asc|desc>")),
            "latest" => match rest.to_lowercase().as_str() {
                "on" | "yes" | "true" => Ok(Self::Latest(true)),
                "off" | "no" | "false" => Ok(Self::Latest(false)),
                _ => Err(ParseError::Usage("latest <on|off>")),
            },
            "search" | "/" => Ok(Self::Search(rest.to_string())),
            "read" => row(rest, "read <row>").map(Self::Read),
            "delete" | "del" => row(rest, "delete <row>").map(Self::Delete),
            "export" => Ok(Self::Export(
                (!rest.is_empty()).then(|| PathBuf::from(rest)),
            )),
            "retry" => Ok(Self::Retry),
            "dismiss" => Ok(Self::Dismiss),
            "refresh" | "r" => Ok(Self::Refresh),
            "logout" => Ok(Self::Logout),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }

    /// Whether the command reads or writes submissions and therefore needs a
    /// fresh admin check.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::Next
                | Self::Prev
                | Self::Sort(_)
                | Self::Order(_)
                | Self::Latest(_)
                | Self::Read(_)
                | Self::Delete(_)
                | Self::Export(_)
                | Self::Retry
                | Self::Refresh
        )
    }
}

fn row(arg: &str, usage: &'static str) -> Result<usize, ParseError> {
    match arg.parse::<usize>() {
        Ok(row) if row > 0 => Ok(row),
        _ => Err(ParseError::Usage(usage)),
    }
}
