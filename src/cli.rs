use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-shrink",
    about = "Shrink images by quality, resolution, palette and target size",
    long_about = "img-shrink reduces image file sizes. It tunes JPEG quality and resolution, \
                  can reduce PNGs to a small palette, and can search for the quality that \
                  lands closest to a target file size. Work runs on a small background pool \
                  and the interactive tune mode shows debounced size estimates.",
    version = "0.1.0",
    after_help = "EXAMPLES:\n  \
    img-shrink compress photo.jpg -q 70 -s 50\n  \
    img-shrink compress photo.jpg -t 200KB -o ./out\n  \
    img-shrink batch ./images -o ./compressed --reduce-colors\n  \
    img-shrink estimate ./images -q 60\n  \
    img-shrink tune photo.png"
)]
pub struct Args {
    #[arg(long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Print per-probe and per-file detail")]
    pub verbose: bool,

    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Number of worker threads (default: min(4, CPU cores))",
        long_help = "Number of background worker threads used for compression and estimation."
    )]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Compression controls shared by every subcommand.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TuningArgs {
    #[arg(
        short = 'q',
        long,
        help = "JPEG quality (0-100, default: 80)",
        long_help = "JPEG quality from 0 (smallest) to 100 (best). \
                     Ignored for PNG output, which is always lossless."
    )]
    pub quality: Option<u8>,

    #[arg(
        short = 's',
        long,
        help = "Resize scale in percent (10-100, default: 100)",
        long_help = "Scale both dimensions to this percentage of the original, never below one pixel."
    )]
    pub scale: Option<u8>,

    #[arg(long, help = "Convert the lower half of the image to grayscale")]
    pub grayscale: bool,

    #[arg(
        long,
        help = "Reduce to a small adaptive palette (forces PNG)",
        long_help = "Quantize to 64 colors (32 in extreme mode) and save as PNG."
    )]
    pub reduce_colors: bool,

    #[arg(
        long,
        help = "Extreme compression",
        long_help = "Caps the resize scale at 70% and the quality floor at 10. \
                     PNG output is forced to a 64-color palette. Quality loss is noticeable."
    )]
    pub extreme: bool,

    #[arg(
        short = 't',
        long,
        help = "Target file size, e.g. 200KB, 1.5MB, 50000B (bare numbers are KB)",
        long_help = "Search the JPEG quality so the output lands close to this size. \
                     Files already smaller than the target are copied unchanged."
    )]
    pub target: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress one image with the given settings, or search for the quality \
                      that reaches a target size. The result is written as compressed_<name>."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(short = 'o', long, help = "Output directory (default: next to the input)")]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    #[command(
        about = "Compress every image in a folder",
        long_about = "Walk a folder recursively (or expand a glob) and compress every \
                      jpg, jpeg, png and gif file one after another."
    )]
    Batch {
        #[arg(
            help = "Input directory, file, or glob",
            long_help = "Input can be a directory path, a single file, or a glob expression. \
                         Examples: './images', './images/*.jpg'"
        )]
        input: String,

        #[arg(
            short = 'o',
            long,
            help = "Output directory (default: next to each input)",
            long_help = "Write results under this directory, keeping the sub-folder layout."
        )]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    #[command(
        about = "Estimate the compressed size without writing output",
        long_about = "Compress into a temporary file and report its size. \
                      For a folder, reports the total over all images."
    )]
    Estimate {
        #[arg(help = "Image file or folder")]
        input: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    #[command(
        about = "Tune settings interactively",
        long_about = "Read commands from standard input (type help for the list). \
                      Every change triggers a debounced size estimate."
    )]
    Tune {
        #[arg(help = "Image file or folder")]
        input: PathBuf,

        #[arg(short = 'o', long, help = "Output directory")]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_compress_with_target() {
        let args = Args::try_parse_from([
            "img-shrink", "compress", "a.jpg", "-q", "60", "-s", "50", "-t", "200KB", "--extreme", "-j", "2",
        ])
        .unwrap();
        assert_eq!(args.threads, Some(2));
        match args.command {
            Commands::Compress { input, output, tuning } => {
                assert_eq!(input, PathBuf::from("a.jpg"));
                assert!(output.is_none());
                assert_eq!(tuning.quality, Some(60));
                assert_eq!(tuning.scale, Some(50));
                assert_eq!(tuning.target.as_deref(), Some("200KB"));
                assert!(tuning.extreme);
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn test_quality_out_of_u8_range_rejected() {
        assert!(Args::try_parse_from(["img-shrink", "compress", "a.jpg", "-q", "300"]).is_err());
    }
}
