//! Colored terminal output for pipeline stages

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

/// How a line is decorated
struct Style {
    symbol: &'static str,
    color: Color,
    bold_symbol: bool,
    color_body: bool,
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn styled(buffer: &mut Buffer, style: &Style, message: &str) -> std::io::Result<()> {
        buffer.set_color(
            ColorSpec::new()
                .set_fg(Some(style.color))
                .set_bold(style.bold_symbol),
        )?;
        write!(buffer, "{}", style.symbol)?;
        buffer.reset()?;
        if style.color_body {
            buffer.set_color(ColorSpec::new().set_fg(Some(style.color)))?;
        }
        writeln!(buffer, " {message}")?;
        buffer.reset()
    }

    fn emit(&self, style: Style, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.bufwtr.buffer();
        Self::styled(&mut buffer, &style, message)?;
        self.bufwtr.print(&buffer)
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.emit(
            Style {
                symbol: "ℹ",
                color: Color::Cyan,
                bold_symbol: false,
                color_body: false,
            },
            message,
        )
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.emit(
            Style {
                symbol: "✓",
                color: Color::Green,
                bold_symbol: true,
                color_body: false,
            },
            message,
        )
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.emit(
            Style {
                symbol: "⚠",
                color: Color::Yellow,
                bold_symbol: true,
                color_body: true,
            },
            message,
        )
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.emit(
            Style {
                symbol: "⋯",
                color: Color::Magenta,
                bold_symbol: false,
                color_body: false,
            },
            message,
        )
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) -> std::io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.emit(
            Style {
                symbol: "→",
                color: Color::Blue,
                bold_symbol: false,
                color_body: false,
            },
            message,
        )
    }

    /// Print an error message to stderr (shown even in quiet mode)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let style = Style {
            symbol: "✗",
            color: Color::Red,
            bold_symbol: true,
            color_body: true,
        };
        if Self::styled(&mut buffer, &style, message).is_err() || bufwtr.print(&buffer).is_err() {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "═══ {title} ═══")?;
        buffer.reset()?;
        self.bufwtr.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.println(&format!("    {message}"))
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.bufwtr.print(&buffer)
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
