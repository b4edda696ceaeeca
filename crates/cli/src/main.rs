use std::path::PathBuf;
use std::process;

use clap::Parser;

use movieio_core::format::movie_format::ContainerFormat;
use movieio_core::format::registry::FormatRegistry;
use movieio_core::media::domain::plane_reader::PlaneReader;
use movieio_core::media::domain::plane_writer::{Destination, PlaneWriter};
use movieio_core::shared::error::MovieError;
use movieio_core::shared::metadata::MovieMetadata;
use movieio_core::shared::plane::Region;

/// Probe movie containers and copy them plane by plane.
#[derive(Parser)]
#[command(name = "movieio")]
struct Cli {
    /// Input movie file.
    input: PathBuf,

    /// Optional output file; when given, every plane of the input is
    /// re-encoded into it.
    output: Option<PathBuf>,

    /// Frame rate recorded in the output (defaults to the input's).
    #[arg(long)]
    frame_rate: Option<f64>,

    /// Output bit rate in bits per second (defaults to 400000).
    #[arg(long)]
    bit_rate: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let registry = FormatRegistry::with_defaults();

    let format = registry
        .format_for_path(&cli.input)
        .ok_or_else(|| format!("unrecognized container suffix: {}", cli.input.display()))?;

    let mut reader = format.create_reader();
    let metadata = reader.set_source(&cli.input)?;
    print_metadata(format.name(), &metadata);

    if let Some(output) = cli.output {
        let out_format = registry
            .format_for_path(&output)
            .ok_or_else(|| format!("unrecognized container suffix: {}", output.display()))?;

        let mut out_meta = metadata.clone();
        if let Some(rate) = cli.frame_rate {
            out_meta.frame_rate = rate;
        }
        if let Some(rate) = cli.bit_rate {
            out_meta.bit_rate = rate;
        }

        let mut writer = out_format.create_writer();
        writer.set_metadata(out_meta);
        writer.set_destination(Destination::File(output.clone()), 0)?;

        let region = Region::full(metadata.width, metadata.height);
        let mut copied = 0;
        loop {
            match reader.open_plane(0, copied, &region) {
                Ok(plane) => {
                    writer.save_plane(0, copied, &plane, &region)?;
                    copied += 1;
                }
                Err(MovieError::EndOfStream) => break,
                Err(e) => return Err(e.into()),
            }
            if copied % 100 == 0 {
                log::info!("copied {copied} planes");
            }
        }
        writer.close()?;

        println!("Wrote {} ({copied} planes)", output.display());
    }

    reader.close();
    Ok(())
}

fn print_metadata(format_name: &str, meta: &MovieMetadata) {
    println!("Format:         {format_name}");
    println!("Dimensions:     {}x{}", meta.width, meta.height);
    println!("Channels:       {}", meta.channels);
    println!("Pixel type:     {:?}", meta.pixel_type);
    println!("Bits per pixel: {}", meta.bits_per_pixel);
    println!("Frame rate:     {:.3} fps", meta.frame_rate);
    println!("Bit rate:       {} bps", meta.bit_rate);
    println!("Plane count:    {}", meta.plane_count);
    println!(
        "Flags:          interleaved={} little_endian={} rgb={}",
        meta.interleaved, meta.little_endian, meta.rgb
    );
}
