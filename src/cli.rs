use clap::{Parser, ValueEnum};
use slidepress_lib::{ConvertType, Viewport};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "slidepress")]
#[command(
    version,
    about = "Slidepress - Convert markdown slide decks into HTML, PDF, PNG and JPEG",
    long_about = "Slidepress\n\nRenders markdown slide decks. HTML is written directly; PDF, PNG and JPEG are captured with a headless Chrome/Chromium (set CHROME_PATH or --browser-path if it is not found).\n\nInputs may be files, directories or '-' for stdin."
)]
pub struct Cli {
    #[arg(value_name = "INPUT", help = "Markdown files or directories ('-' reads stdin)")]
    pub inputs: Vec<PathBuf>,

    #[arg(
        long,
        short,
        value_name = "PATH",
        help = "Output file, or directory with --input-dir ('-' writes stdout)"
    )]
    pub output: Option<String>,

    #[arg(
        long,
        short = 'I',
        value_name = "DIR",
        help = "Convert every markdown file under DIR, mirroring the tree into --output"
    )]
    pub input_dir: Option<PathBuf>,

    #[arg(
        long = "type",
        value_name = "TYPE",
        help = "Output type: html, pdf, png, jpeg (inferred from --output when omitted)"
    )]
    pub convert_type: Option<ConvertType>,

    #[arg(long, conflicts_with_all = ["convert_type", "image"], help = "Shorthand for --type pdf")]
    pub pdf: bool,

    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        conflicts_with = "convert_type",
        help = "Shorthand for --type png/jpeg"
    )]
    pub image: Option<ImageKind>,

    #[arg(long, help = "HTML template (bare, bespoke)")]
    pub template: Option<String>,

    #[arg(long, value_name = "1-100", help = "JPEG quality")]
    pub jpeg_quality: Option<u8>,

    #[arg(
        long,
        help = "Allow the browser to read local files referenced by the deck (insecure)"
    )]
    pub allow_local_files: bool,

    #[arg(long, overrides_with = "no_html", help = "Allow raw HTML in markdown")]
    pub html: bool,

    #[arg(long, overrides_with = "html", help = "Disallow raw HTML in markdown")]
    pub no_html: bool,

    #[arg(long, help = "Default document language (e.g., en, ja)")]
    pub lang: Option<String>,

    #[arg(long, help = "Override the theme directive")]
    pub theme: Option<String>,

    #[arg(long, help = "Override the slide size (16:9, 4:3 or WIDTHxHEIGHT)")]
    pub size: Option<Viewport>,

    #[arg(long, help = "Override the title directive")]
    pub title: Option<String>,

    #[arg(long, help = "Override the description directive")]
    pub description: Option<String>,

    #[arg(long, help = "Override the author directive")]
    pub author: Option<String>,

    #[arg(long, help = "Override the canonical url directive")]
    pub url: Option<String>,

    #[arg(long, value_name = "URL", help = "Override the Open Graph image directive")]
    pub og_image: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Override the keywords directive (comma-separated)")]
    pub keywords: Option<Vec<String>>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Theme stylesheet or directory of them (/* @theme name */); repeatable"
    )]
    pub theme_set: Vec<PathBuf>,

    #[arg(long, short, help = "Re-convert when inputs or themes change")]
    pub watch: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        value_name = "PATH",
        help = "Optional config file (TOML); CLI flags override config"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "SECS", help = "Navigation timeout (seconds) for browser capture")]
    pub nav_timeout: Option<u64>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Network idle timeout (seconds) for browser capture"
    )]
    pub network_idle_timeout: Option<u64>,

    #[arg(long, value_name = "PATH", help = "Chrome/Chromium executable")]
    pub browser_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl Cli {
    /// Explicit output type from `--pdf`, `--image` or `--type`.
    pub fn requested_type(&self) -> Option<ConvertType> {
        if self.pdf {
            return Some(ConvertType::Pdf);
        }
        match self.image {
            Some(ImageKind::Png) => Some(ConvertType::Png),
            Some(ImageKind::Jpeg) => Some(ConvertType::Jpeg),
            None => self.convert_type,
        }
    }

    /// `Some` only when `--html` or `--no-html` was given.
    pub fn html_flag(&self) -> Option<bool> {
        match (self.html, self.no_html) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, ImageKind};
    use clap::Parser;
    use slidepress_lib::{ConvertType, Viewport};

    #[test]
    fn defaults_leave_everything_to_config() {
        let cli = Cli::parse_from(["slidepress", "deck.md"]);

        assert_eq!(cli.inputs.len(), 1);
        assert!(cli.output.is_none());
        assert!(cli.requested_type().is_none());
        assert!(cli.html_flag().is_none());
        assert!(cli.nav_timeout.is_none());
        assert!(!cli.watch);
        assert!(!cli.verbose);
    }

    #[test]
    fn overrides_are_parsed() {
        let cli = Cli::parse_from([
            "slidepress",
            "a.md",
            "b.md",
            "--type",
            "jpeg",
            "--jpeg-quality",
            "70",
            "--size",
            "4:3",
            "--keywords",
            "rust,slides",
            "--no-html",
            "--nav-timeout",
            "5",
            "-o",
            "-",
        ]);

        assert_eq!(cli.requested_type(), Some(ConvertType::Jpeg));
        assert_eq!(cli.jpeg_quality, Some(70));
        assert_eq!(cli.size, Some(Viewport::STANDARD));
        assert_eq!(
            cli.keywords,
            Some(vec!["rust".to_string(), "slides".to_string()])
        );
        assert_eq!(cli.html_flag(), Some(false));
        assert_eq!(cli.nav_timeout, Some(5));
        assert_eq!(cli.output.as_deref(), Some("-"));
    }

    #[test]
    fn shorthands_select_type() {
        let cli = Cli::parse_from(["slidepress", "--pdf", "deck.md"]);
        assert_eq!(cli.requested_type(), Some(ConvertType::Pdf));

        let cli = Cli::parse_from(["slidepress", "--image", "png", "deck.md"]);
        assert_eq!(cli.image, Some(ImageKind::Png));
        assert_eq!(cli.requested_type(), Some(ConvertType::Png));
    }

    #[test]
    fn conflicting_type_flags_are_rejected() {
        assert!(Cli::try_parse_from(["slidepress", "--pdf", "--type", "png", "a.md"]).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Cli::try_parse_from(["slidepress", "--type", "gif", "a.md"]).is_err());
    }
}
