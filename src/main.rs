use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use mzwavelet::text::{samples_from_file, samples_to_writer};
use mzwavelet::WaveletCentroider;

/// Centroid a profile spectrum stored as `mz<TAB>intensity` lines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The profile spectrum to read
    path: PathBuf,

    /// Peaks whose intensity does not exceed this value are dropped
    #[arg(short, long, default_value_t = 0.0)]
    noise_level: f32,

    /// The dilation of the wavelet, in samples per wavelet unit
    #[arg(short, long, default_value_t = 1)]
    scale_level: u32,

    /// The window width of the Mexican Hat wavelet
    #[arg(short, long, default_value_t = 1.0)]
    wavelet_window: f64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let samples = samples_from_file(&args.path)?;
    let centroider = WaveletCentroider::new(args.noise_level, args.scale_level, args.wavelet_window)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let start = Instant::now();
    let peaks = centroider
        .centroid(&samples)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    eprintln!(
        "Found {} peaks in {} samples in {} milliseconds",
        peaks.len(),
        samples.len(),
        (Instant::now() - start).as_millis()
    );
    samples_to_writer(&peaks, &mut io::stdout().lock())?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["mzwavelet", "spectrum.txt"]);
        assert_eq!(args.path, PathBuf::from("spectrum.txt"));
        assert_eq!(args.noise_level, 0.0);
        assert_eq!(args.scale_level, 1);
        assert_eq!(args.wavelet_window, 1.0);

        let args = Args::parse_from(["mzwavelet", "spectrum.txt", "-n", "25", "-s", "3", "-w", "0.5"]);
        assert_eq!(args.noise_level, 25.0);
        assert_eq!(args.scale_level, 3);
        assert_eq!(args.wavelet_window, 0.5);

        assert!(Args::try_parse_from(["mzwavelet"]).is_err());
    }
}
