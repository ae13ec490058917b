use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "heic2jpg")]
#[command(about = "HEIC/HEIF to JPEG conversion service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// TOML settings file
    #[arg(short, long, global = true, env = "HEIC2JPG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: SettingsOverrides,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Convert a single file locally
    Convert {
        /// Input HEIC/HEIF file
        input: PathBuf,

        /// Output JPEG path (defaults to the input name with .jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Target width
        #[arg(long)]
        width: Option<u32>,

        /// Target height
        #[arg(long)]
        height: Option<u32>,

        /// Ignore the aspect ratio when both dimensions are given
        #[arg(long)]
        stretch: bool,

        /// Counter-clockwise rotation in degrees (90, 180, 270)
        #[arg(short, long, allow_hyphen_values = true)]
        rotate: Option<i32>,
    },

    /// Run one cleanup sweep over the temp directory and exit
    Sweep,
}

/// Settings that can be overridden from the command line or environment.
#[derive(Args, Debug, Default)]
pub struct SettingsOverrides {
    #[arg(long, global = true, env = "PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Allowed CORS origins, comma separated
    #[arg(long, global = true, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    #[arg(long, global = true, env = "TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Maximum upload size in bytes
    #[arg(long, global = true, env = "MAX_FILE_SIZE")]
    pub max_file_size: Option<u64>,

    #[arg(long, global = true, env = "ALLOWED_EXTENSIONS", value_delimiter = ',')]
    pub allowed_extensions: Option<Vec<String>>,

    /// Default JPEG quality
    #[arg(long, global = true, env = "JPG_QUALITY")]
    pub jpg_quality: Option<u8>,

    #[arg(long, global = true, env = "AUTO_CLEANUP", value_parser = BoolishValueParser::new())]
    pub auto_cleanup: Option<bool>,

    #[arg(long, global = true, env = "FILE_RETENTION_MINUTES")]
    pub file_retention_minutes: Option<u64>,

    #[arg(long, global = true, env = "CLEANUP_INTERVAL_SECS")]
    pub cleanup_interval_secs: Option<u64>,

    #[arg(long, global = true, env = "HOST")]
    pub host: Option<String>,

    #[arg(long, global = true, env = "PORT")]
    pub port: Option<u16>,
}

impl SettingsOverrides {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(project_name) = self.project_name {
            settings.project_name = project_name;
        }
        if let Some(origins) = self.cors_origins {
            settings.cors_origins = origins.into_iter().map(|o| o.trim().to_string()).collect();
        }
        if let Some(temp_dir) = self.temp_dir {
            settings.temp_dir = temp_dir;
        }
        if let Some(max_file_size) = self.max_file_size {
            settings.max_file_size = max_file_size;
        }
        if let Some(extensions) = self.allowed_extensions {
            settings.allowed_extensions = extensions;
        }
        if let Some(quality) = self.jpg_quality {
            settings.jpeg_quality = quality;
        }
        if let Some(auto_cleanup) = self.auto_cleanup {
            settings.auto_cleanup = auto_cleanup;
        }
        if let Some(minutes) = self.file_retention_minutes {
            settings.file_retention_minutes = minutes;
        }
        if let Some(secs) = self.cleanup_interval_secs {
            settings.cleanup_interval_secs = secs;
        }
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn convert_accepts_negative_rotation() {
        let cli = Cli::try_parse_from(["heic2jpg", "convert", "in.heic", "--rotate", "-90"]).unwrap();
        match cli.command {
            Some(Commands::Convert { rotate, .. }) => assert_eq!(rotate, Some(-90)),
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let overrides = SettingsOverrides {
            port: Some(9000),
            auto_cleanup: Some(false),
            ..Default::default()
        };
        let settings = overrides.apply(Settings::default());

        assert_eq!(settings.port, 9000);
        assert!(!settings.auto_cleanup);
        assert_eq!(settings.jpeg_quality, 95);
    }
}
