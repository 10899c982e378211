//! Read and write spectra as tab-separated `mz<TAB>intensity` lines.
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path;

use crate::buffer::SampleBuffer;

fn invalid_data<E: ToString>(line_number: usize, err: E) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line {}: {}", line_number + 1, err.to_string()),
    )
}

/// Parse a spectrum from `reader`, skipping blank lines and `#` comments.
///
/// Lines do not need to be sorted, they are placed in m/z order as they are read.
pub fn samples_from_reader<R: BufRead>(reader: R) -> io::Result<SampleBuffer> {
    let mut samples = SampleBuffer::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let pref = line.trim();
        if pref.is_empty() || pref.starts_with('#') {
            continue;
        }
        let mut chunks = pref.split_whitespace();
        let (Some(mz), Some(intensity)) = (chunks.next(), chunks.next()) else {
            return Err(invalid_data(line_number, "expected an m/z and an intensity"));
        };
        let mz: f64 = mz.parse().map_err(|e| invalid_data(line_number, e))?;
        let intensity: f32 = intensity.parse().map_err(|e| invalid_data(line_number, e))?;
        if mz.is_nan() {
            return Err(invalid_data(line_number, "m/z cannot be NaN"));
        }
        samples.add(mz, intensity);
    }
    Ok(samples)
}

pub fn samples_from_file<P: AsRef<path::Path>>(path: P) -> io::Result<SampleBuffer> {
    let reader = io::BufReader::new(fs::File::open(path)?);
    samples_from_reader(reader)
}

pub fn samples_to_writer<W: Write>(samples: &SampleBuffer, writer: &mut W) -> io::Result<()> {
    for sample in samples.iter() {
        writeln!(writer, "{}\t{}", sample.mz, sample.intensity)?;
    }
    Ok(())
}

pub fn samples_to_file<P: AsRef<path::Path>>(samples: &SampleBuffer, path: P) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    samples_to_writer(samples, &mut writer)?;
    writer.flush()
}
