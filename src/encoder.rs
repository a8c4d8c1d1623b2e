use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{Level, debug, error, info, log_enabled, trace, warn};

use huffman_graba::huffman::{
    build_code_table, build_huffman_tree, count_frequencies, entropy_from_freq, render_tree,
};
use huffman_graba::{ARCHIVE_EXTENSION, Result, compress_into};

fn log_code_table(data: &[u8]) -> Result<()> {
    let tree = build_huffman_tree(&count_frequencies(data))?;
    if log_enabled!(Level::Trace) {
        trace!("Huffman tree:\n{}", render_tree(&tree));
    }
    for (byte, code) in build_code_table(&tree) {
        debug!(
            "{:#04x} ('{}') => {}",
            byte,
            (byte as char).escape_default(),
            code
        );
    }
    Ok(())
}

/// Picks the archive path, refusing one that would overwrite the input.
fn resolve_output(input: &Path, requested: Option<&str>) -> Option<PathBuf> {
    let output = match requested {
        Some(out) => PathBuf::from(out),
        None => input.with_extension(ARCHIVE_EXTENSION),
    };
    if output == input {
        return None;
    }
    Some(output)
}

fn write_archive(data: &[u8], extension: &str, output: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(output)?);
    let padding = compress_into(data, extension, &mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    debug!("Archive written with {} padding bits", padding);
    Ok(fs::metadata(output)?.len())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        error!("Usage: {} <input_file> [output_file]", args[0]);
        eprintln!("  <input_file>:  file to compress.");
        eprintln!(
            "  [output_file]: where to write the archive (default: <input>.{}).",
            ARCHIVE_EXTENSION
        );
        process::exit(1);
    }

    let input_path = Path::new(&args[1]);
    if input_path.extension().is_some_and(|e| e == ARCHIVE_EXTENSION) {
        warn!(
            "{} already looks like an archive, use decode to unpack it.",
            input_path.display()
        );
    }
    let Some(output_path) = resolve_output(input_path, args.get(2).map(String::as_str)) else {
        error!(
            "Refusing to overwrite {} with its own archive.",
            input_path.display()
        );
        process::exit(1);
    };
    let extension = input_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!("--- Start Encoding ---");
    info!("Reading input file: {}", input_path.display());
    let data = match fs::read(input_path) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to read {}: {}", input_path.display(), e);
            process::exit(1);
        }
    };

    if data.is_empty() {
        error!("{} is empty, nothing to compress.", input_path.display());
        process::exit(1);
    }

    if log_enabled!(Level::Debug) {
        if let Err(e) = log_code_table(&data) {
            error!("Could not build code table: {}", e);
            process::exit(1);
        }
    }

    info!("Writing archive to: {}", output_path.display());
    let archive_size = match write_archive(&data, &extension, &output_path) {
        Ok(size) => size,
        Err(e) => {
            error!("Compression failed: {}", e);
            let _ = fs::remove_file(&output_path);
            process::exit(1);
        }
    };

    let original_len = data.len() as u64;
    let file_entropy = entropy_from_freq(&count_frequencies(&data));
    let compression_ratio = 100.0 * (1.0 - (archive_size as f64) / (original_len as f64));

    println!(
        "\r\n✅ Encoding successful.\n\
         📂  Input:       {} ({} bytes)\n\
         💾  Output:      {} ({} bytes)\n\
         ℹ️  Entropy:     {:.4} bits/symbol\n\
         🗜️  Ratio:       {:.4}%",
        input_path.display(),
        original_len,
        output_path.display(),
        archive_size,
        file_entropy,
        compression_ratio
    );

    info!("--- End ---");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_swaps_extension() {
        assert_eq!(
            resolve_output(Path::new("docs/notes.txt"), None),
            Some(PathBuf::from("docs/notes.graba"))
        );
        assert_eq!(
            resolve_output(Path::new("notes.txt"), Some("out.bin")),
            Some(PathBuf::from("out.bin"))
        );
    }

    #[test]
    fn archive_input_is_never_overwritten() {
        assert_eq!(resolve_output(Path::new("backup.graba"), None), None);
        assert_eq!(resolve_output(Path::new("a.txt"), Some("a.txt")), None);
    }
}
