//! Interactive page-count prompt
//!
//! Used when neither the command line nor the configuration caps the number
//! of listing pages.

use std::io::{self, BufRead, Write};

pub const PAGE_COUNT_PROMPT: &str = "Enter the number of pages to scrape (e.g., 5): ";
pub const NOT_POSITIVE: &str = "Please enter an integer greater than 0.";
pub const NOT_A_NUMBER: &str = "Please enter a valid number.";

/// Asks for a page count until a positive integer is entered
///
/// Returns an `UnexpectedEof` error if input ends first.
pub fn read_page_count<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<u32> {
    let mut line = String::new();
    loop {
        write!(output, "{}", PAGE_COUNT_PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no page count entered",
            ));
        }

        match line.trim().parse::<i64>() {
            Ok(n) if n > 0 => match u32::try_from(n) {
                Ok(pages) => return Ok(pages),
                Err(_) => writeln!(output, "{}", NOT_A_NUMBER)?,
            },
            Ok(_) => writeln!(output, "{}", NOT_POSITIVE)?,
            Err(_) => writeln!(output, "{}", NOT_A_NUMBER)?,
        }
    }
}
