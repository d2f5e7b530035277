use crate::errors::{EvRemixesError, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Numbered terminal menus. Input is read asynchronously so Ctrl-C can
/// interrupt a pending prompt.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

pub type StdPrompter = Prompter<BufReader<Stdin>, std::io::Stdout>;

impl StdPrompter {
    pub fn stdio() -> Self {
        Prompter::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// One trimmed line. End of input means the user walked away.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).await?;
        if read == 0 {
            return Err(EvRemixesError::Cancelled);
        }
        Ok(line.trim().to_string())
    }

    fn show_menu<S: AsRef<str>>(&mut self, question: &str, options: &[S]) -> Result<()> {
        writeln!(self.output, "\n{}:", question)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, option.as_ref())?;
        }
        Ok(())
    }

    /// Pick one option; returns its index. Empty input picks the first.
    pub async fn select<S: AsRef<str>>(&mut self, question: &str, options: &[S]) -> Result<usize> {
        if options.is_empty() {
            return Err(EvRemixesError::Cancelled);
        }

        self.show_menu(question, options)?;
        loop {
            write!(self.output, "Choice [1]: ")?;
            self.output.flush()?;

            let line = self.read_line().await?;
            if is_quit(&line) {
                return Err(EvRemixesError::Cancelled);
            }
            if line.is_empty() {
                return Ok(0);
            }
            match parse_choice(&line, options.len()) {
                Some(index) => return Ok(index),
                None => writeln!(self.output, "Please enter a number from 1 to {}.", options.len())?,
            }
        }
    }

    /// Pick any number of options: `1 3`, `1,3`, `2-4` or `all`
    pub async fn multi_select<S: AsRef<str>>(&mut self, question: &str, options: &[S]) -> Result<Vec<usize>> {
        if options.is_empty() {
            return Ok(Vec::new());
        }

        self.show_menu(question, options)?;
        loop {
            write!(self.output, "Choices (e.g. 1 3, 2-4, all): ")?;
            self.output.flush()?;

            let line = self.read_line().await?;
            if is_quit(&line) {
                return Err(EvRemixesError::Cancelled);
            }
            match parse_multi(&line, options.len()) {
                Some(indices) => return Ok(indices),
                None => writeln!(self.output, "Please enter numbers from 1 to {}.", options.len())?,
            }
        }
    }

    /// Free text, possibly empty
    pub async fn text(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}: ", question)?;
        self.output.flush()?;
        self.read_line().await
    }
}

fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit")
}

/// 1-based menu number to index
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Some(n - 1),
        _ => None,
    }
}

/// Sorted, deduplicated indices from a selection like `3, 1 5-6`
pub fn parse_multi(input: &str, count: usize) -> Option<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input.eq_ignore_ascii_case("a") {
        return Some((0..count).collect());
    }

    let mut indices = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_choice(start, count)?;
                let end = parse_choice(end, count)?;
                if start > end {
                    return None;
                }
                indices.extend(start..=end);
            }
            None => indices.push(parse_choice(part, count)?),
        }
    }

    if indices.is_empty() {
        return None;
    }
    indices.sort_unstable();
    indices.dedup();
    Some(indices)
}
