use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::{FixedOffset, Offset, Utc};
use clap::Parser;
use tracing::info;

pub const DB_FILE_NAME: &str = "shoebox.db.json";

#[derive(Parser, Debug)]
#[command(name = "shoebox", about = "Photo library server")]
pub struct FlatConfig {
    #[arg(long, env = "SHOEBOX_WORKDIR", default_value = ".", help = "Directory holding the DB file and the bucket")]
    workdir: PathBuf,

    #[arg(long, env = "SHOEBOX_BUCKET_DIR", default_value = "my-photo-bucket", help = "Bucket directory, relative to the workdir")]
    bucket_dir: PathBuf,

    #[arg(long, env = "SHOEBOX_ADDR", default_value = "[::]:5000", help = "Address to listen on")]
    addr: SocketAddr,

    #[arg(long, env = "SHOEBOX_MOMENT_WINDOW", default_value = "5m", value_parser = humantime::parse_duration, help = "Largest gap between two photos of one moment")]
    moment_window: Duration,

    #[arg(long, env = "SHOEBOX_UTC_OFFSET", default_value_t = 0, allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1439..=1439), help = "Minutes east of UTC used for moment labels")]
    utc_offset: i32,

    #[arg(long, env = "SHOEBOX_MAX_UPLOAD_BYTES", default_value_t = 52_428_800, help = "Request body limit for uploads")]
    max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfiguration,
    pub storage: StorageConfiguration,
    pub moments: MomentConfiguration,
}

#[derive(Debug, Clone)]
pub struct ServerConfiguration {
    pub addr: SocketAddr,        // SHOEBOX_ADDR
    pub max_upload_bytes: usize, // SHOEBOX_MAX_UPLOAD_BYTES
}

#[derive(Debug, Clone)]
pub struct StorageConfiguration {
    pub workdir: PathBuf,    // SHOEBOX_WORKDIR
    pub bucket_dir: PathBuf, // SHOEBOX_BUCKET_DIR
}

#[derive(Debug, Clone)]
pub struct MomentConfiguration {
    pub window: Duration,        // SHOEBOX_MOMENT_WINDOW
    pub utc_offset_minutes: i32, // SHOEBOX_UTC_OFFSET
}

impl From<FlatConfig> for Config {
    fn from(value: FlatConfig) -> Self {
        let bucket_dir = value.workdir.join(value.bucket_dir);
        Config {
            server: ServerConfiguration {
                addr: value.addr,
                max_upload_bytes: value.max_upload_bytes,
            },
            storage: StorageConfiguration {
                workdir: value.workdir,
                bucket_dir,
            },
            moments: MomentConfiguration {
                window: value.moment_window,
                utc_offset_minutes: value.utc_offset,
            },
        }
    }
}

impl Config {
    pub fn parse() -> Self {
        FlatConfig::parse().into()
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        FlatConfig::try_parse_from(args).map(Into::into)
    }

    /// Defaults rooted at `workdir`, ignoring the command line and environment.
    pub fn with_workdir(workdir: &Path) -> Self {
        Config {
            server: ServerConfiguration {
                addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, 5000)),
                max_upload_bytes: 52_428_800,
            },
            storage: StorageConfiguration {
                workdir: workdir.to_path_buf(),
                bucket_dir: workdir.join("my-photo-bucket"),
            },
            moments: MomentConfiguration {
                window: crate::moments::MOMENT_WINDOW,
                utc_offset_minutes: 0,
            },
        }
    }
}

impl StorageConfiguration {
    pub fn db_path(&self) -> PathBuf {
        self.workdir.join(DB_FILE_NAME)
    }

    pub fn get_or_create_workdir(&self) -> anyhow::Result<PathBuf> {
        info!("workdir: {}", self.workdir.display());
        if !self.workdir.exists() {
            std::fs::create_dir_all(&self.workdir)?;
        }
        if !self.workdir.is_dir() {
            anyhow::bail!("workdir is not a directory");
        }
        Ok(self.workdir.canonicalize()?)
    }
}

impl MomentConfiguration {
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "shoebox",
            "--workdir", "/srv/photos",
            "--addr", "127.0.0.1:8080",
            "--moment-window", "90s",
            "--utc-offset", "-300",
            "--max-upload-bytes", "1024",
        ]).unwrap();

        assert_eq!(config.storage.workdir, PathBuf::from("/srv/photos"));
        assert_eq!(config.storage.bucket_dir, PathBuf::from("/srv/photos/my-photo-bucket"));
        assert_eq!(config.storage.db_path(), PathBuf::from("/srv/photos/shoebox.db.json"));
        assert_eq!(config.server.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.moments.window, Duration::from_secs(90));
        assert_eq!(config.moments.utc_offset(), FixedOffset::west_opt(5 * 3600).unwrap());
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert!(Config::try_parse_from(["shoebox", "--utc-offset", "1440"]).is_err());
        assert!(Config::try_parse_from(["shoebox", "--moment-window", "soon"]).is_err());
    }

    #[test]
    fn creates_missing_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_workdir(&dir.path().join("nested/library"));
        let workdir = config.storage.get_or_create_workdir().unwrap();
        assert!(workdir.is_dir());
    }
}
