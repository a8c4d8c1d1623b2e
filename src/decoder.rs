use std::env;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{Level, debug, error, info, log_enabled, trace};

use huffman_graba::huffman::{build_code_table, build_huffman_tree, entropy_from_freq, render_tree};
use huffman_graba::{CompressedContainer, Result, decompress};

const DECOMPRESSED_SUFFIX: &str = "_decompressed";

fn read_archive(path: &Path) -> Result<CompressedContainer> {
    let mut reader = BufReader::new(File::open(path)?);
    CompressedContainer::read_from(&mut reader)
}

fn default_stem(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, DECOMPRESSED_SUFFIX))
}

fn output_path(stem: PathBuf, extension: &str) -> PathBuf {
    if extension.is_empty() {
        return stem;
    }
    let mut name = stem.into_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        error!("Usage: {} <input_file> [output_stem]", args[0]);
        eprintln!("  📂 <input_file>:  path to the archive.");
        eprintln!(
            "  💾 [output_stem]: output path without extension (default: <input>{}).",
            DECOMPRESSED_SUFFIX
        );
        process::exit(1);
    }

    let input_path = Path::new(&args[1]);
    let stem = match args.get(2) {
        Some(stem) => PathBuf::from(stem),
        None => default_stem(input_path),
    };

    info!("--- Start Decoding ---");
    info!("Reading archive: {}", input_path.display());

    let container = match read_archive(input_path) {
        Ok(container) => container,
        Err(e) => {
            error!("Failed to read archive: {}", e);
            process::exit(1);
        }
    };
    let file_entropy = entropy_from_freq(&container.frequencies);

    if log_enabled!(Level::Debug) {
        match build_huffman_tree(&container.frequencies) {
            Ok(tree) => {
                trace!("Huffman tree:\n{}", render_tree(&tree));
                for (byte, code) in build_code_table(&tree) {
                    debug!(
                        "{:#04x} ('{}') => {}",
                        byte,
                        (byte as char).escape_default(),
                        code
                    );
                }
            }
            Err(e) => debug!("No code table to list: {}", e),
        }
    }

    let (data, extension) = match decompress(container) {
        Ok(decoded) => decoded,
        Err(e) => {
            error!("Decompression failed: {}", e);
            process::exit(1);
        }
    };

    let output = output_path(stem, &extension);
    info!("Writing decoded output to file: {}", output.display());
    if let Err(e) = write_output(&output, &data) {
        error!("Could not write decoded data: {}", e);
        let _ = fs::remove_file(&output);
        process::exit(1);
    }
    info!("Write successful.");

    let input_size = fs::metadata(input_path).map(|m| m.len()).unwrap_or(0);
    let output_size = data.len() as u64;
    let ratio = if output_size > 0 {
        100.0 * (1.0 - (input_size as f64) / (output_size as f64))
    } else {
        0.0
    };

    println!(
        "\r\n✅ decoding successful.\n\
         📂 input file:        {} ({} bytes)\n\
         💾 output file:       {} ({} bytes)\n\
         ℹ️ entropy:           {:.2} bits/symbol\n\
         🗜️ compression ratio: {:.2}% (relative to decoded output)",
        input_path.display(),
        input_size,
        output.display(),
        output_size,
        file_entropy,
        ratio
    );

    info!("--- End ---");
}
