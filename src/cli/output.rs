//! Output formatting for resolved formats

use crate::cli::args::VerbosityLevel;
use crate::core::format::Format;
use crate::platform::formats::DescriptorFailure;
use colored::Colorize;

/// Output formatter for ryx
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print the format table
    pub fn print_formats(&self, video_id: &str, formats: &[Format]) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!(
                "{} {} ({} formats)",
                "video".bold(),
                video_id,
                formats.len()
            );
        }
        for format in formats {
            println!("{}", format_row(format));
            if self.verbosity == VerbosityLevel::Verbose {
                println!("      {}", format.url.as_str().dimmed());
            }
        }
    }

    /// Print one URL per line
    pub fn print_urls(&self, formats: &[Format]) {
        for format in formats {
            println!("{}", format.url);
        }
    }

    /// Print formats as pretty JSON
    pub fn print_json(&self, formats: &[Format]) -> Result<(), serde_json::Error> {
        println!("{}", serde_json::to_string_pretty(formats)?);
        Ok(())
    }

    /// Report descriptors that could not be deciphered
    pub fn print_failures(&self, failures: &[DescriptorFailure]) {
        for failure in failures {
            let itag = failure
                .itag
                .map(|itag| itag.to_string())
                .unwrap_or_else(|| "?".to_string());
            self.warning(&format!("itag={} skipped: {}", itag, failure.error));
        }
    }
}

/// One table row: itag, extension, quality, bitrate and size
fn format_row(format: &Format) -> String {
    let itag = format
        .itag
        .map(|itag| itag.to_string())
        .unwrap_or_else(|| "-".to_string());
    let ext = format.file_extension.as_deref().unwrap_or("-");
    let bitrate = format
        .bitrate
        .map(|kbps| format!("{:.0} kbps", kbps))
        .unwrap_or_default();
    let size = format.filesize.map(format_bytes).unwrap_or_default();
    let kind = if format.is_audio_only() {
        "audio only".magenta()
    } else if format.has_video() && !format.has_audio() {
        "video only".blue()
    } else {
        "".normal()
    };

    format!(
        "  {:>4}  {:<5} {:<10} {:>10} {:>10}  {}",
        itag.bold(),
        ext,
        format.display_quality(),
        bitrate,
        size,
        kind
    )
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn format() -> Format {
        Format {
            itag: Some(140),
            file_extension: Some("m4a".to_string()),
            mime_type: Some("audio/mp4; codecs=\"mp4a.40.2\"".to_string()),
            bitrate: Some(129.5),
            filesize: Some(3 * 1024 * 1024),
            sample_rate: Some(44100),
            ..Format::new(Url::parse("https://r.example/vp?id=140").unwrap())
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_row_columns() {
        colored::control::set_override(false);
        let row = format_row(&format());
        assert!(row.contains("140"));
        assert!(row.contains("m4a"));
        assert!(row.contains("130 kbps") || row.contains("129 kbps"));
        assert!(row.contains("3.0 MB"));
        assert!(row.contains("audio only"));
    }

    #[test]
    fn test_format_row_without_metadata() {
        colored::control::set_override(false);
        let row = format_row(&Format::new(Url::parse("https://r.example/vp").unwrap()));
        assert!(row.contains("-"));
        assert!(row.contains("unknown"));
    }

    #[test]
    fn test_quiet_mode_prints_without_panicking() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        formatter.error("test");
        formatter.warning("test");
        formatter.print_formats("dQw4w9WgXcQ", &[format()]);
        formatter.print_urls(&[format()]);
        formatter.print_json(&[format()]).unwrap();
    }
}
