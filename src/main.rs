use assetcache::crypto::KeySet;
use assetcache::Cache;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "acache", version = "0.1.0", about = "Legacy game-asset cache reader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of the bundle at `root`.
    Info {
        root: PathBuf,
        #[arg(long, default_value = "32")]
        index_count: u32,
    },
    /// Print one archive's manifest (format, version, directive, folders).
    Manifest {
        root: PathBuf,
        #[arg(long, default_value = "32")]
        index_count: u32,
        #[arg(long)]
        archive: u32,
    },
    /// Build the release manifest and print it, or write its wire form.
    Release {
        root: PathBuf,
        #[arg(long, default_value = "32")]
        index_count: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch and decode one folder, writing its payload to disk.
    Folder {
        root: PathBuf,
        #[arg(long, default_value = "32")]
        index_count: u32,
        #[arg(long)]
        archive: u32,
        #[arg(long)]
        folder: u32,
        /// Four comma-separated 32-bit XTEA key words, e.g. "1,2,3,4".
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Fetch a folder, split it into packs via its manifest, write each pack.
    Packs {
        root: PathBuf,
        #[arg(long, default_value = "32")]
        index_count: u32,
        #[arg(long)]
        archive: u32,
        #[arg(long)]
        folder: u32,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Info { root, index_count } => {
            let cache = Cache::open_dir(&root, index_count)?;
            println!("Bundle: {}", root.display());
            println!("  Archives:       {}", cache.archive_count());
            println!("  Index files:    {}", cache.index_count());
            for archive_id in 0..cache.archive_count() {
                match cache.get_archive_manifest(archive_id) {
                    Ok(manifest) => println!(
                        "  archive {archive_id:>4}: format={} version={} folders={}",
                        manifest.format,
                        manifest.version,
                        manifest.folder_count()
                    ),
                    Err(e) => println!("  archive {archive_id:>4}: unreadable manifest ({e})"),
                }
            }
        }

        Commands::Manifest { root, index_count, archive } => {
            let cache = Cache::open_dir(&root, index_count)?;
            let manifest = cache.get_archive_manifest(archive)?;
            println!("Archive {archive} manifest:");
            println!("  format:     {}", manifest.format);
            println!("  version:    {}", manifest.version);
            println!("  directive:  0x{:02x} (labels: {})", manifest.directive, manifest.has_labels());
            println!("  folders:    {}", manifest.folder_count());
            for folder in manifest.iter_folders() {
                println!(
                    "    id={:<6} crc=0x{:08x} version={:<6} packs={} label_hash={:?}",
                    folder.id, folder.crc, folder.version, folder.pack_count, folder.label_hash
                );
            }
        }

        Commands::Release { root, index_count, out } => {
            let cache = Cache::open_dir(&root, index_count)?;
            let release = cache.get_release_manifest()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, release.to_bytes())?;
                    println!("Wrote release manifest ({} archives) → {}", release.archive_count(), path.display());
                }
                None => {
                    println!("Release manifest ({} archives):", release.archive_count());
                    for i in 0..release.archive_count() {
                        println!("  archive {i:>4}: version={:<8} crc=0x{:08x}", release.versions[i], release.checksums[i]);
                    }
                }
            }
        }

        Commands::Folder { root, index_count, archive, folder, key, out } => {
            let cache = Cache::open_dir(&root, index_count)?;
            let key = parse_key(key.as_deref());
            let decoded = cache.get_folder(archive, folder, &key)?;
            std::fs::write(&out, &decoded.payload)?;
            println!(
                "Wrote folder {archive}/{folder} ({} bytes, compression={:?}) → {}",
                decoded.payload.len(),
                decoded.compression,
                out.display()
            );
        }

        Commands::Packs { root, index_count, archive, folder, key, out_dir } => {
            let cache = Cache::open_dir(&root, index_count)?;
            let key = parse_key(key.as_deref());
            let packs = cache.get_packs(archive, folder, &key)?;
            std::fs::create_dir_all(&out_dir)?;
            for (i, pack) in packs.iter().enumerate() {
                let path = out_dir.join(format!("pack_{i}.bin"));
                std::fs::write(&path, pack)?;
            }
            println!("Wrote {} pack(s) → {}", packs.len(), out_dir.display());
        }
    }

    Ok(())
}

fn parse_key(spec: Option<&str>) -> KeySet {
    match spec {
        None => assetcache::crypto::ZERO_KEY,
        Some(s) => {
            let mut key = assetcache::crypto::ZERO_KEY;
            for (i, word) in s.split(',').take(4).enumerate() {
                key[i] = word.trim().parse().unwrap_or(0);
            }
            key
        }
    }
}
