//! Line-based prompting, shared by the menus and the console approval prompt.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

/// A reader/writer pair that asks questions and reads one-line answers.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
}

/// The process' stdin/stdout.
pub type StdConsole = Console<BufReader<Stdin>, Stdout>;

impl StdConsole {
    /// Console on stdin/stdout.
    pub fn stdio() -> Self {
        Console::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Wraps any reader/writer, eg byte slices in tests.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes a line.
    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")?;
        self.output.flush()
    }

    /// Prints `question` and reads the trimmed answer. `None` at end of input.
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Gives back the writer, handy for checking output in tests.
    pub fn into_output(self) -> W {
        self.output
    }
}
