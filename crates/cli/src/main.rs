use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use updown_core::{
    CoreConfig, FileService, FileSystemStorage, COPY_BUFFER_SIZE, STORAGE_LOCATION_ENV,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "updown")]
#[command(about = "UpDown file store CLI")]
struct Cli {
    /// Storage directory (defaults to $UPDOWN_STORAGE_LOCATION, then `upload-dir`)
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage directory
    Init,
    /// Store local files under their file names
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List stored files
    List,
    /// Copy a stored file out of the store
    Download {
        /// Stored filename
        name: String,
        /// Destination (defaults to the filename in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a zip archive of stored files
    Zip {
        /// Archive path
        out: PathBuf,
        /// Stored filenames, in archive order
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete the storage directory and everything in it
    Clear,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'updown --help' for commands");
        return Ok(());
    };

    let root = cli.root.or_else(|| std::env::var(STORAGE_LOCATION_ENV).ok());
    let cfg = CoreConfig::from_env_values(root, None, None)?;
    let storage = FileSystemStorage::new(cfg.storage_location())?;
    let service = FileService::new(Arc::new(storage));

    run(&service, command, &mut io::stdout().lock())
}

fn run(service: &FileService, command: Commands, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Commands::Init => {
            service.prepare(false)?;
            writeln!(out, "Storage ready")?;
        }
        Commands::Upload { paths } => {
            let sources = paths
                .iter()
                .map(|path| -> CliResult<(String, File)> { Ok((upload_name(path)?, File::open(path)?)) })
                .collect::<CliResult<Vec<_>>>()?;
            service.upload_files(sources.iter().map(|(name, file)| (name.as_str(), file)))?;
            for (name, _) in &sources {
                writeln!(out, "File uploaded successfully: {}", name)?;
            }
        }
        Commands::List => {
            let names = service.list_files()?;
            if names.is_empty() {
                writeln!(out, "No files stored.")?;
            }
            for name in names {
                writeln!(out, "{}", name)?;
            }
        }
        Commands::Download { name, out: dest } => {
            let dest = dest.unwrap_or_else(|| PathBuf::from(&name));
            let mut stored = service.load(&name)?;
            let mut file = File::create(&dest)?;
            let copied = io::copy(&mut stored, &mut file)?;
            writeln!(out, "Wrote {} bytes to {}", copied, dest.display())?;
        }
        Commands::Zip { out: dest, names } => {
            let archive = service.zip_files(names);
            let entries = archive.filenames().len();
            let file = File::create(&dest)?;
            if let Err(e) = archive.write_to(BufWriter::with_capacity(COPY_BUFFER_SIZE, file)) {
                let _ = std::fs::remove_file(&dest);
                return Err(e.into());
            }
            writeln!(out, "Wrote {} files to {}", entries, dest.display())?;
        }
        Commands::Clear => {
            service.storage().delete_all()?;
            writeln!(out, "Storage cleared")?;
        }
    }
    Ok(())
}

/// Name a local file is stored under: its final path component.
fn upload_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| format!("cannot determine a file name for {}", path.display()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    fn service(temp: &TempDir) -> FileService {
        let root = temp.path().join("store");
        let storage = FileSystemStorage::new(root.to_string_lossy()).unwrap();
        FileService::new(Arc::new(storage))
    }

    fn run_captured(service: &FileService, command: Commands) -> CliResult<String> {
        let mut out = Vec::new();
        run(service, command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_upload_list_download() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let source = temp.path().join("notes.txt");
        std::fs::write(&source, "remember").unwrap();

        run_captured(&service, Commands::Init).unwrap();
        let uploaded = run_captured(
            &service,
            Commands::Upload {
                paths: vec![source],
            },
        )
        .unwrap();
        assert_eq!(uploaded, "File uploaded successfully: notes.txt\n");

        let listed = run_captured(&service, Commands::List).unwrap();
        assert_eq!(listed, "notes.txt\n");

        let dest = temp.path().join("copy.txt");
        run_captured(
            &service,
            Commands::Download {
                name: "notes.txt".into(),
                out: Some(dest.clone()),
            },
        )
        .unwrap();
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "remember");
    }

    #[test]
    fn test_upload_missing_source_stores_nothing() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();
        let present = temp.path().join("present.txt");
        std::fs::write(&present, "here").unwrap();

        let result = run_captured(
            &service,
            Commands::Upload {
                paths: vec![present, temp.path().join("absent.txt")],
            },
        );

        assert!(result.is_err());
        assert!(service.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_list_empty_store() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();

        assert_eq!(
            run_captured(&service, Commands::List).unwrap(),
            "No files stored.\n"
        );
    }

    #[test]
    fn test_upload_empty_file_fails() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();
        let source = temp.path().join("empty.txt");
        std::fs::write(&source, "").unwrap();

        let result = run_captured(
            &service,
            Commands::Upload {
                paths: vec![source],
            },
        );

        assert!(result.is_err());
        assert!(service.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_zip_writes_archive() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();
        service.upload_file("a.txt", &mut "alpha".as_bytes()).unwrap();
        let dest = temp.path().join("bundle.zip");

        run_captured(
            &service,
            Commands::Zip {
                out: dest.clone(),
                names: vec!["a.txt".into()],
            },
        )
        .unwrap();

        let bytes = std::fs::read(&dest).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "alpha");
    }

    #[test]
    fn test_zip_failure_removes_partial_archive() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();
        let dest = temp.path().join("bundle.zip");

        let result = run_captured(
            &service,
            Commands::Zip {
                out: dest.clone(),
                names: vec!["missing.txt".into()],
            },
        );

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_clear_removes_store() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        service.prepare(false).unwrap();
        service.upload_file("a.txt", &mut "a".as_bytes()).unwrap();

        run_captured(&service, Commands::Clear).unwrap();

        assert!(!temp.path().join("store").exists());
    }
}
