use clap::Parser;
use geojson_route_filter::{
    filter_features, normalize_id_set, DigestAlgorithm, ExecutionMode, Executor, FilterError,
    FilterResult, FilterStats,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Filter a GeoJSON FeatureCollection, keeping only features whose
/// properties.route_ids contain at least one of the given ids.
#[derive(Parser, Debug)]
#[command(name = "geojson-route-filter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input GeoJSON file (FeatureCollection); omit or use - for stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output GeoJSON file; omit or use - for stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Allowed route ids, up to 38 digits each. Space or comma separated;
    /// each comma-separated part is its own id, so `1,abc` keeps 1 and drops abc
    #[arg(long, required = true, num_args = 1.., value_delimiter = ',')]
    ids: Vec<String>,

    /// Keep top-level keys besides type and features (buffered mode only)
    #[arg(long)]
    preserve_top: bool,

    /// Execution mode: auto, streaming or buffered
    #[arg(long, default_value = "auto")]
    mode: ExecutionMode,

    /// Compute a checksum of the written output (sha256, sha512)
    #[arg(long)]
    digest: Option<DigestAlgorithm>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> FilterResult<()> {
    let allow = normalize_id_set(&cli.ids)?;
    log::debug!("Allow-set: {:?}", allow.sorted());

    let executor = Executor::select(cli.mode, cli.preserve_top)?;

    let input: Box<dyn Read> = match stdio_or_path(cli.input.as_deref()) {
        None => Box::new(io::stdin().lock()),
        Some(path) => Box::new(File::open(path)?),
    };

    let stats = match stdio_or_path(cli.output.as_deref()) {
        Some(path) => {
            let stats = write_atomically(path, |output| {
                filter_features(input, output, &allow, executor, cli.digest)
            })?;
            log::info!("Written to {}", path.display());
            stats
        }
        None => {
            let mut output = BufWriter::new(io::stdout().lock());
            let stats = filter_features(input, &mut output, &allow, executor, cli.digest)?;
            output.flush()?;
            stats
        }
    };

    log::info!(
        "Kept {} of {} features ({} mode, {} allowed ids)",
        stats.kept,
        stats.scanned,
        executor.name(),
        allow.len()
    );
    if let (Some(algorithm), Some(checksum)) = (cli.digest, &stats.digest) {
        eprintln!("{}: {}", algorithm, checksum);
    }

    Ok(())
}

/// `None` for stdin/stdout (no path or `-`)
fn stdio_or_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| p.as_os_str() != "-")
}

/// Write through a temporary file next to `path` and rename it into place
/// only once `write` has succeeded
fn write_atomically<F>(path: &Path, write: F) -> FilterResult<FilterStats>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> FilterResult<FilterStats>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = temp_file_builder().tempfile_in(dir)?;
    // Replacing a file keeps its mode
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }

    let stats = {
        let mut output = BufWriter::new(&mut tmp);
        let stats = write(&mut output)?;
        output.flush()?;
        stats
    };

    tmp.persist(path).map_err(|e| FilterError::Io(e.error))?;
    Ok(stats)
}

/// New outputs get the same mode as `File::create` (0666 minus umask)
#[cfg(unix)]
fn temp_file_builder() -> Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = Builder::new();
    builder.permissions(fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_file_builder() -> Builder<'static, 'static> {
    Builder::new()
}
